//! Active-section tracker: the single source of truth for "which section
//! is the reader currently viewing".
//!
//! One tracker instance per page view. The instance exclusively owns its
//! Navigation Index and Active State; nothing is shared across page views
//! and nothing mutates the Active State except the recompute step.

use std::time::Instant;

use crate::config::{AboveFirst, TrackerConfig};
use crate::document::{sanitize, DocumentSnapshot};
use crate::events::PageEvent;
use crate::index::NavIndex;
use crate::logging::{
    log_heading_skipped, log_highlight, log_index_built, log_nav_disabled, log_scroll_sample,
    log_slow_build, log_teardown,
};
use crate::platform::{Capabilities, HostPage};
use crate::throttle::{Gate, Throttle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Uninitialized,
    Ready,
    /// Too few usable headings; nav hidden, no listener. Terminal.
    Disabled,
    /// Page unloaded; listener detached, timers cancelled. Terminal.
    TornDown,
}

impl TrackerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerState::Uninitialized => "uninitialized",
            TrackerState::Ready => "ready",
            TrackerState::Disabled => "disabled",
            TrackerState::TornDown => "torn_down",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionError {
    pub msg: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrackerStats {
    pub scroll_events: u64,
    pub recomputes: u64,
    pub coalesced: u64,
    pub highlight_changes: u64,
    pub skipped_headings: u64,
    pub build_ms: f64,
}

pub struct SectionTracker {
    cfg: TrackerConfig,
    caps: Capabilities,
    page: String,
    state: TrackerState,
    index: NavIndex,
    active: Option<usize>,
    throttle: Throttle,
    pub stats: TrackerStats,
}

impl SectionTracker {
    pub fn new(cfg: TrackerConfig, caps: Capabilities) -> Self {
        let throttle = Throttle::new(cfg.throttle_ms);
        Self {
            cfg,
            caps,
            page: String::new(),
            state: TrackerState::Uninitialized,
            index: NavIndex::build(&[]),
            active: None,
            throttle,
            stats: TrackerStats::default(),
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Id of the currently active heading, if any.
    pub fn active_id(&self) -> Option<&str> {
        self.active
            .and_then(|i| self.index.entry(i))
            .map(|e| e.id.as_str())
    }

    /// Build the navigation index from the rendered document and reveal
    /// the nav, or disable the feature when too few headings qualify.
    /// Fewer than `min_headings` usable headings means the nav stays
    /// hidden and no scroll listener is ever registered.
    pub fn init(
        &mut self,
        snapshot: &DocumentSnapshot,
        host: &mut dyn HostPage,
    ) -> Result<TrackerState, TransitionError> {
        if self.state != TrackerState::Uninitialized {
            return Err(TransitionError {
                msg: format!("init from {}", self.state.as_str()),
            });
        }
        self.page = snapshot.page.clone();

        host.nav_building().map_err(host_err)?;

        let started = Instant::now();
        let (kept, skipped) = sanitize(&snapshot.headings);
        for s in &skipped {
            log_heading_skipped(&self.page, s.position, &s.id, s.reason.as_str());
        }
        self.stats.skipped_headings = skipped.len() as u64;
        self.index = NavIndex::build(&kept);
        let build_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats.build_ms = build_ms;

        log_index_built(&self.page, self.index.len(), skipped.len(), build_ms);
        if build_ms > self.cfg.build_warn_ms as f64 {
            log_slow_build(&self.page, build_ms, self.cfg.build_warn_ms);
        }

        if self.index.len() < self.cfg.min_headings {
            host.hide_nav().map_err(host_err)?;
            log_nav_disabled(&self.page, self.index.len(), self.cfg.min_headings);
            self.state = TrackerState::Disabled;
            return Ok(self.state);
        }

        let ids: Vec<&str> = self.index.entries().iter().map(|e| e.id.as_str()).collect();
        host.build_nav(&ids).map_err(host_err)?;
        host.reveal_nav().map_err(host_err)?;
        host.attach_scroll_listener(self.caps.passive_listeners)
            .map_err(host_err)?;
        self.state = TrackerState::Ready;
        Ok(self.state)
    }

    /// Rate-limited scroll entry point. Events in a closed throttle
    /// interval coalesce into the one pending timer; events outside Ready
    /// are ignored without mutation.
    pub fn on_scroll(
        &mut self,
        now_ms: u64,
        offset: f64,
        host: &mut dyn HostPage,
    ) -> Result<(), TransitionError> {
        if self.state != TrackerState::Ready {
            return Ok(());
        }
        self.stats.scroll_events += 1;
        match self.throttle.offer(now_ms, offset) {
            Gate::Run(offset) => {
                log_scroll_sample(&self.page, offset, "run");
                self.recompute(offset, host)
            }
            Gate::ArmTimer { fire_at_ms } => {
                log_scroll_sample(&self.page, offset, "deferred");
                host.arm_timer(fire_at_ms).map_err(host_err)
            }
            Gate::Coalesced => {
                self.stats.coalesced += 1;
                log_scroll_sample(&self.page, offset, "coalesced");
                Ok(())
            }
        }
    }

    /// Trailing-edge timer callback.
    pub fn on_timer(
        &mut self,
        now_ms: u64,
        host: &mut dyn HostPage,
    ) -> Result<(), TransitionError> {
        if self.state != TrackerState::Ready {
            return Ok(());
        }
        if let Some(offset) = self.throttle.fire(now_ms) {
            self.recompute(offset, host)?;
        }
        Ok(())
    }

    /// Recompute Active State for a scroll offset and diff against the
    /// previous value. An unchanged result makes no host call at all.
    fn recompute(&mut self, offset: f64, host: &mut dyn HostPage) -> Result<(), TransitionError> {
        self.stats.recomputes += 1;
        let located = self.index.locate(offset, self.cfg.lookahead_px);
        let next = match (located, self.cfg.above_first) {
            (Some(i), _) => Some(i),
            (None, AboveFirst::NoneActive) => None,
            (None, AboveFirst::FirstActive) => {
                if self.index.is_empty() {
                    None
                } else {
                    Some(0)
                }
            }
        };

        if next == self.active {
            return Ok(());
        }

        if let Some(prev) = self.active.and_then(|i| self.index.entry(i)) {
            host.clear_active(prev.link).map_err(host_err)?;
        }
        if let Some(entry) = next.and_then(|i| self.index.entry(i)) {
            host.set_active(entry.link).map_err(host_err)?;
        }
        let from = self.active.and_then(|i| self.index.entry(i)).map(|e| e.id.clone());
        let to = next.and_then(|i| self.index.entry(i)).map(|e| e.id.clone());
        log_highlight(&self.page, from.as_deref(), to.as_deref(), offset);
        self.active = next;
        self.stats.highlight_changes += 1;
        Ok(())
    }

    /// Page unload: detach the listener, cancel the pending timer, release
    /// the index. Idempotent; residual events afterwards are inert.
    pub fn teardown(&mut self, host: &mut dyn HostPage) -> Result<(), TransitionError> {
        match self.state {
            TrackerState::Ready => {
                host.detach_scroll_listener().map_err(host_err)?;
                if self.throttle.has_pending() {
                    host.cancel_timer().map_err(host_err)?;
                }
                self.throttle.cancel();
                self.index = NavIndex::build(&[]);
                self.active = None;
                self.state = TrackerState::TornDown;
                log_teardown(
                    &self.page,
                    &[
                        ("scroll_events", self.stats.scroll_events),
                        ("recomputes", self.stats.recomputes),
                        ("coalesced", self.stats.coalesced),
                        ("highlight_changes", self.stats.highlight_changes),
                    ],
                );
            }
            TrackerState::Uninitialized => {
                // Nothing was attached; nothing to detach.
                self.state = TrackerState::TornDown;
            }
            TrackerState::Disabled | TrackerState::TornDown => {}
        }
        Ok(())
    }

    /// Dispatch one replay event. Events apply strictly in input order.
    pub fn apply_event(
        &mut self,
        event: &PageEvent,
        host: &mut dyn HostPage,
    ) -> Result<(), TransitionError> {
        match event {
            PageEvent::Ready { snapshot } => self.init(snapshot, host).map(|_| ()),
            PageEvent::Scroll { ts_ms, offset } => self.on_scroll(*ts_ms, *offset, host),
            PageEvent::TimerFired { ts_ms } => self.on_timer(*ts_ms, host),
            PageEvent::Unload => self.teardown(host),
        }
    }
}

fn host_err(msg: String) -> TransitionError {
    TransitionError { msg }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Heading;
    use crate::platform::{HostCall, NavLink, RecordingHost};

    fn snapshot(offsets: &[f64]) -> DocumentSnapshot {
        DocumentSnapshot {
            page: "/test".to_string(),
            headings: offsets
                .iter()
                .enumerate()
                .map(|(i, &offset)| Heading {
                    id: format!("h{}", i),
                    offset,
                })
                .collect(),
        }
    }

    fn ready_tracker(offsets: &[f64]) -> (SectionTracker, RecordingHost) {
        let mut tracker = SectionTracker::new(TrackerConfig::default(), Capabilities::default());
        let mut host = RecordingHost::new();
        tracker.init(&snapshot(offsets), &mut host).unwrap();
        assert_eq!(tracker.state(), TrackerState::Ready);
        (tracker, host)
    }

    #[test]
    fn test_single_heading_disables_feature() {
        let mut tracker = SectionTracker::new(TrackerConfig::default(), Capabilities::default());
        let mut host = RecordingHost::new();
        let state = tracker.init(&snapshot(&[100.0]), &mut host).unwrap();
        assert_eq!(state, TrackerState::Disabled);
        assert!(host.calls.contains(&HostCall::HideNav));
        assert_eq!(host.count(|c| matches!(c, HostCall::AttachScroll { .. })), 0);
        assert_eq!(host.count(|c| matches!(c, HostCall::RevealNav)), 0);
    }

    #[test]
    fn test_zero_headings_is_valid_empty_case() {
        let mut tracker = SectionTracker::new(TrackerConfig::default(), Capabilities::default());
        let mut host = RecordingHost::new();
        let state = tracker.init(&snapshot(&[]), &mut host).unwrap();
        assert_eq!(state, TrackerState::Disabled);
    }

    #[test]
    fn test_init_builds_then_reveals() {
        let (_, host) = ready_tracker(&[0.0, 500.0]);
        let building = host
            .calls
            .iter()
            .position(|c| matches!(c, HostCall::NavBuilding));
        let reveal = host.calls.iter().position(|c| matches!(c, HostCall::RevealNav));
        assert!(building.unwrap() < reveal.unwrap());
    }

    #[test]
    fn test_double_init_is_transition_error() {
        let (mut tracker, mut host) = ready_tracker(&[0.0, 500.0]);
        assert!(tracker.init(&snapshot(&[0.0, 500.0]), &mut host).is_err());
    }

    #[test]
    fn test_recompute_diffs_highlight() {
        let mut cfg = TrackerConfig::default();
        cfg.lookahead_px = 0.0;
        let mut tracker = SectionTracker::new(cfg, Capabilities::default());
        let mut host = RecordingHost::new();
        tracker
            .init(&snapshot(&[0.0, 500.0, 1200.0]), &mut host)
            .unwrap();

        tracker.on_scroll(0, 700.0, &mut host).unwrap();
        assert_eq!(tracker.active_id(), Some("h1"));
        assert_eq!(host.active_links(), vec![NavLink(1)]);

        // Same offset again, outside the throttle interval: no-op diff,
        // no further style churn.
        let calls_before = host.calls.len();
        tracker.on_scroll(100, 700.0, &mut host).unwrap();
        assert_eq!(host.calls.len(), calls_before);
        assert_eq!(tracker.stats.recomputes, 2);
        assert_eq!(tracker.stats.highlight_changes, 1);
    }

    #[test]
    fn test_above_first_clears_highlight() {
        let mut cfg = TrackerConfig::default();
        cfg.lookahead_px = 0.0;
        let mut tracker = SectionTracker::new(cfg, Capabilities::default());
        let mut host = RecordingHost::new();
        tracker.init(&snapshot(&[100.0, 500.0]), &mut host).unwrap();

        tracker.on_scroll(0, 300.0, &mut host).unwrap();
        assert_eq!(tracker.active_id(), Some("h0"));
        tracker.on_scroll(100, 10.0, &mut host).unwrap();
        assert_eq!(tracker.active_id(), None);
        assert!(host.active_links().is_empty());
    }

    #[test]
    fn test_first_active_policy() {
        let mut cfg = TrackerConfig::default();
        cfg.lookahead_px = 0.0;
        cfg.above_first = AboveFirst::FirstActive;
        let mut tracker = SectionTracker::new(cfg, Capabilities::default());
        let mut host = RecordingHost::new();
        tracker.init(&snapshot(&[100.0, 500.0]), &mut host).unwrap();

        tracker.on_scroll(0, 10.0, &mut host).unwrap();
        assert_eq!(tracker.active_id(), Some("h0"));
    }

    #[test]
    fn test_burst_coalesces_and_trailing_fires() {
        let mut cfg = TrackerConfig::default();
        cfg.lookahead_px = 0.0;
        let mut tracker = SectionTracker::new(cfg, Capabilities::default());
        let mut host = RecordingHost::new();
        tracker
            .init(&snapshot(&[0.0, 500.0, 1200.0]), &mut host)
            .unwrap();

        tracker.on_scroll(0, 100.0, &mut host).unwrap();
        tracker.on_scroll(2, 600.0, &mut host).unwrap();
        tracker.on_scroll(5, 900.0, &mut host).unwrap();
        tracker.on_scroll(9, 1300.0, &mut host).unwrap();
        // One deferred timer for the burst, coalescing the rest.
        assert_eq!(host.count(|c| matches!(c, HostCall::ArmTimer { .. })), 1);
        assert_eq!(tracker.stats.coalesced, 2);
        assert_eq!(tracker.stats.recomputes, 1);

        // The trailing fire reflects the last event's offset.
        tracker.on_timer(16, &mut host).unwrap();
        assert_eq!(tracker.active_id(), Some("h2"));
        assert_eq!(tracker.stats.recomputes, 2);
    }

    #[test]
    fn test_teardown_makes_residual_events_inert() {
        let (mut tracker, mut host) = ready_tracker(&[0.0, 500.0]);
        tracker.on_scroll(0, 600.0, &mut host).unwrap();
        tracker.on_scroll(3, 700.0, &mut host).unwrap(); // pending timer
        tracker.teardown(&mut host).unwrap();
        assert_eq!(tracker.state(), TrackerState::TornDown);
        assert!(host.calls.contains(&HostCall::DetachScroll));
        assert!(host.calls.contains(&HostCall::CancelTimer));

        let calls_before = host.calls.len();
        tracker.on_scroll(100, 900.0, &mut host).unwrap();
        tracker.on_timer(120, &mut host).unwrap();
        assert_eq!(host.calls.len(), calls_before);
        assert_eq!(tracker.active_id(), None);

        // Teardown is idempotent.
        tracker.teardown(&mut host).unwrap();
        assert_eq!(host.calls.len(), calls_before);
    }

    #[test]
    fn test_teardown_without_pending_skips_cancel() {
        let (mut tracker, mut host) = ready_tracker(&[0.0, 500.0]);
        tracker.on_scroll(0, 600.0, &mut host).unwrap();
        tracker.teardown(&mut host).unwrap();
        assert_eq!(host.count(|c| matches!(c, HostCall::CancelTimer)), 0);
    }

    #[test]
    fn test_disabled_ignores_everything() {
        let mut tracker = SectionTracker::new(TrackerConfig::default(), Capabilities::default());
        let mut host = RecordingHost::new();
        tracker.init(&snapshot(&[100.0]), &mut host).unwrap();
        let calls_before = host.calls.len();
        tracker.on_scroll(0, 600.0, &mut host).unwrap();
        tracker.teardown(&mut host).unwrap();
        assert_eq!(tracker.state(), TrackerState::Disabled);
        assert_eq!(host.calls.len(), calls_before);
    }

    #[test]
    fn test_malformed_headings_skipped_not_fatal() {
        let mut tracker = SectionTracker::new(TrackerConfig::default(), Capabilities::default());
        let mut host = RecordingHost::new();
        let snap = DocumentSnapshot {
            page: "/test".to_string(),
            headings: vec![
                Heading {
                    id: "intro".to_string(),
                    offset: 0.0,
                },
                Heading {
                    id: String::new(),
                    offset: 250.0,
                },
                Heading {
                    id: "end".to_string(),
                    offset: 900.0,
                },
            ],
        };
        let state = tracker.init(&snap, &mut host).unwrap();
        assert_eq!(state, TrackerState::Ready);
        assert_eq!(tracker.stats.skipped_headings, 1);
        match &host.calls[1] {
            HostCall::BuildNav(ids) => assert_eq!(ids, &["intro", "end"]),
            other => panic!("expected BuildNav second, got {:?}", other),
        }
    }
}
