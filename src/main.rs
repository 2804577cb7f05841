use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Result};
use tokio::time::{sleep, Duration};

use scrollspy::config::TrackerConfig;
use scrollspy::document::{snapshot_sha256, DocumentSnapshot};
use scrollspy::events::PageEvent;
use scrollspy::logging::{log, log_session_summary, log_snapshot_audit, obj, v_str, Domain, Level};
use scrollspy::platform::{Capabilities, HostPage, NavLink};
use scrollspy::tracker::{SectionTracker, TrackerState};

/// Host for an offline session: logs page effects and exposes the armed
/// trailing timer so the run loop can fire it at the right virtual time.
struct SessionHost {
    pending_timer: Option<u64>,
}

impl SessionHost {
    fn new() -> Self {
        Self {
            pending_timer: None,
        }
    }

    fn nav(&self, action: &str) {
        log(
            Level::Debug,
            Domain::Nav,
            action,
            obj(&[("msg", v_str(action))]),
        );
    }
}

impl HostPage for SessionHost {
    fn nav_building(&mut self) -> Result<(), String> {
        self.nav("nav_building");
        Ok(())
    }

    fn build_nav(&mut self, ids: &[&str]) -> Result<(), String> {
        log(
            Level::Info,
            Domain::Nav,
            "nav_built",
            obj(&[("links", serde_json::json!(ids))]),
        );
        Ok(())
    }

    fn reveal_nav(&mut self) -> Result<(), String> {
        self.nav("nav_reveal");
        Ok(())
    }

    fn hide_nav(&mut self) -> Result<(), String> {
        self.nav("nav_hide");
        Ok(())
    }

    fn set_active(&mut self, link: NavLink) -> Result<(), String> {
        log(
            Level::Debug,
            Domain::Highlight,
            "class_add",
            obj(&[("link", serde_json::json!(link.0))]),
        );
        Ok(())
    }

    fn clear_active(&mut self, link: NavLink) -> Result<(), String> {
        log(
            Level::Debug,
            Domain::Highlight,
            "class_remove",
            obj(&[("link", serde_json::json!(link.0))]),
        );
        Ok(())
    }

    fn attach_scroll_listener(&mut self, passive: bool) -> Result<(), String> {
        log(
            Level::Info,
            Domain::System,
            "listener_attached",
            obj(&[("passive", serde_json::json!(passive))]),
        );
        Ok(())
    }

    fn detach_scroll_listener(&mut self) -> Result<(), String> {
        self.nav("listener_detached");
        Ok(())
    }

    fn arm_timer(&mut self, fire_at_ms: u64) -> Result<(), String> {
        self.pending_timer = Some(fire_at_ms);
        Ok(())
    }

    fn cancel_timer(&mut self) -> Result<(), String> {
        self.pending_timer = None;
        Ok(())
    }
}

/// Load a JSON-lines scroll trace, skipping blank and comment lines.
fn load_trace(path: &Path) -> Result<Vec<PageEvent>> {
    let file = File::open(path)?;
    let mut events = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<PageEvent>(trimmed) {
            Ok(evt) => events.push(evt),
            Err(err) => eprintln!("bad trace line skipped: {}", err),
        }
    }
    Ok(events)
}

/// Fallback demo trace: a burst-heavy pass down the document and a jump
/// back to the top, exercising throttle coalescing and both boundaries.
fn synth_trace(snapshot: &DocumentSnapshot) -> Vec<PageEvent> {
    let bottom = snapshot
        .headings
        .iter()
        .map(|h| h.offset)
        .fold(0.0_f64, f64::max)
        + 800.0;
    let mut events = Vec::new();
    let mut ts = 0u64;
    let steps = 40;
    for i in 0..=steps {
        let offset = bottom * i as f64 / steps as f64;
        events.push(PageEvent::Scroll { ts_ms: ts, offset });
        ts += 4; // faster than the throttle interval: bursts coalesce
    }
    ts += 100;
    events.push(PageEvent::Scroll { ts_ms: ts, offset: 0.0 });
    events
}

fn event_ts(event: &PageEvent) -> Option<u64> {
    match event {
        PageEvent::Scroll { ts_ms, .. } | PageEvent::TimerFired { ts_ms } => Some(*ts_ms),
        _ => None,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = TrackerConfig::from_env();
    // Feature detection is the platform adapter's job, done once up front;
    // the tracker only ever sees the resolved flags.
    let caps = Capabilities::default();

    let snapshot_path = Path::new(&cfg.snapshot_path);
    let snapshot = DocumentSnapshot::load(snapshot_path)?;
    let hash = snapshot_sha256(snapshot_path)?;
    log_snapshot_audit(&snapshot.page, &cfg.snapshot_path, &hash);

    let trace = match load_trace(Path::new(&cfg.trace_path)) {
        Ok(events) if !events.is_empty() => events,
        _ => {
            log(
                Level::Info,
                Domain::System,
                "trace_synthesized",
                obj(&[("msg", v_str("no trace file, using synthetic scroll pass"))]),
            );
            synth_trace(&snapshot)
        }
    };

    let page = snapshot.page.clone();
    let mut tracker = SectionTracker::new(cfg, caps);
    let mut host = SessionHost::new();

    let state = tracker
        .init(&snapshot, &mut host)
        .map_err(|e| anyhow!(e.msg))?;
    if state == TrackerState::Disabled {
        log(
            Level::Info,
            Domain::System,
            "session_disabled",
            obj(&[("page", v_str(&page))]),
        );
        return Ok(());
    }

    let mut clock_ms = 0u64;
    for event in &trace {
        // The runner owns initialization; a Ready line in a captured trace
        // is already satisfied by the snapshot load above.
        if matches!(event, PageEvent::Ready { .. }) {
            continue;
        }
        let next_ts = event_ts(event).unwrap_or(clock_ms);

        // Fire the trailing timer if it comes due before this event.
        if let Some(fire_at) = host.pending_timer {
            if fire_at <= next_ts {
                sleep(Duration::from_millis((fire_at.saturating_sub(clock_ms)).min(50))).await;
                host.pending_timer = None;
                tracker
                    .on_timer(fire_at, &mut host)
                    .map_err(|e| anyhow!(e.msg))?;
                clock_ms = fire_at;
            }
        }

        sleep(Duration::from_millis((next_ts.saturating_sub(clock_ms)).min(50))).await;
        clock_ms = next_ts;
        tracker
            .apply_event(event, &mut host)
            .map_err(|e| anyhow!(e.msg))?;
    }

    // Drain any timer still pending after the last scroll event so the
    // final position is reflected.
    if let Some(fire_at) = host.pending_timer.take() {
        sleep(Duration::from_millis(
            (fire_at.saturating_sub(clock_ms)).min(50),
        ))
        .await;
        tracker
            .on_timer(fire_at, &mut host)
            .map_err(|e| anyhow!(e.msg))?;
    }

    tracker.teardown(&mut host).map_err(|e| anyhow!(e.msg))?;
    log_session_summary(
        &page,
        tracker.stats.scroll_events,
        tracker.stats.recomputes,
        tracker.stats.coalesced,
        tracker.stats.highlight_changes,
    );
    Ok(())
}
