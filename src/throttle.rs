//! Scroll throttle: at most one recompute per interval, trailing sample
//! guaranteed.
//!
//! The throttle is deterministic and clock-injected; it never sleeps. The
//! host owns the single real timer and arms it only when told to, so the
//! at-most-one-in-flight-timer guarantee lives here, not in the host.

/// What the host must do with an offered scroll sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    /// Interval is open: recompute with this offset now.
    Run(f64),
    /// Sample parked for the trailing edge: arm one timer for `fire_at_ms`.
    ArmTimer { fire_at_ms: u64 },
    /// Sample replaced the parked one; a timer is already in flight.
    Coalesced,
}

#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: u64,
    last_run_ms: Option<u64>,
    pending: Option<f64>,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            last_run_ms: None,
            pending: None,
        }
    }

    /// Offer a scroll sample. Samples inside a closed interval coalesce:
    /// the parked offset is overwritten, no second timer is armed, and the
    /// one pending timer reads the latest value when it fires.
    pub fn offer(&mut self, now_ms: u64, offset: f64) -> Gate {
        if self.pending.is_some() {
            self.pending = Some(offset);
            return Gate::Coalesced;
        }
        match self.last_run_ms {
            Some(last) if now_ms < last + self.interval_ms => {
                self.pending = Some(offset);
                Gate::ArmTimer {
                    fire_at_ms: last + self.interval_ms,
                }
            }
            _ => {
                self.last_run_ms = Some(now_ms);
                Gate::Run(offset)
            }
        }
    }

    /// Timer callback: yields the parked offset, opening a new interval.
    /// Returns None after cancel or a spurious fire.
    pub fn fire(&mut self, now_ms: u64) -> Option<f64> {
        let offset = self.pending.take()?;
        self.last_run_ms = Some(now_ms);
        Some(offset)
    }

    /// Drop the parked sample. The host cancels its timer alongside; a
    /// fire that races cancellation becomes a spurious no-op above.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
