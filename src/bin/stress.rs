//! Stress test for the section tracker.
//!
//! Generates randomized page views (heading layouts and scroll bursts) and
//! checks the tracker's invariants on every one:
//! - at most one highlighted link at any point in the call log
//! - recompute at an unchanged offset mutates nothing (idempotence)
//! - a burst inside one throttle interval arms exactly one timer
//! - residual events after teardown are inert
//!
//! Usage: cargo run --release --bin stress

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use scrollspy::config::TrackerConfig;
use scrollspy::document::{DocumentSnapshot, Heading};
use scrollspy::platform::{Capabilities, HostCall, RecordingHost};
use scrollspy::tracker::{SectionTracker, TrackerState};

fn random_snapshot(rng: &mut StdRng, view: usize) -> DocumentSnapshot {
    let n = rng.gen_range(0..20);
    let mut offset = 0.0;
    let headings = (0..n)
        .map(|i| {
            offset += rng.gen_range(0.0..900.0);
            Heading {
                // A sprinkling of unusable headings exercises sanitization.
                id: if rng.gen_bool(0.05) {
                    String::new()
                } else {
                    format!("p{}-h{}", view, i)
                },
                offset,
            }
        })
        .collect();
    DocumentSnapshot {
        page: format!("/stress/{}", view),
        headings,
    }
}

fn check_single_active(host: &RecordingHost) -> Result<(), String> {
    let mut active: Vec<usize> = Vec::new();
    for call in &host.calls {
        match call {
            HostCall::SetActive(link) => active.push(link.0),
            HostCall::ClearActive(link) => active.retain(|l| *l != link.0),
            _ => {}
        }
        if active.len() > 1 {
            return Err(format!("two links active at once: {:?}", active));
        }
    }
    Ok(())
}

fn run_page_view(rng: &mut StdRng, view: usize) -> Result<(u64, u64), String> {
    let mut tracker = SectionTracker::new(TrackerConfig::default(), Capabilities::default());
    let mut host = RecordingHost::new();
    let snapshot = random_snapshot(rng, view);

    let state = tracker
        .init(&snapshot, &mut host)
        .map_err(|e| e.msg)?;
    if state == TrackerState::Disabled {
        if host.count(|c| matches!(c, HostCall::AttachScroll { .. })) != 0 {
            return Err("disabled page registered a scroll listener".to_string());
        }
        return Ok((0, 0));
    }

    let bottom = snapshot
        .headings
        .iter()
        .map(|h| h.offset)
        .fold(0.0_f64, f64::max)
        + 500.0;
    let mut now = 0u64;
    let mut armed = host.count(|c| matches!(c, HostCall::ArmTimer { .. }));

    for _ in 0..rng.gen_range(1..30) {
        // One burst: several samples inside a single throttle interval.
        let burst = rng.gen_range(1..8);
        for _ in 0..burst {
            let offset = rng.gen_range(-200.0..bottom);
            tracker.on_scroll(now, offset, &mut host).map_err(|e| e.msg)?;
            now += rng.gen_range(0..4);
        }
        let newly_armed = host.count(|c| matches!(c, HostCall::ArmTimer { .. })) - armed;
        if newly_armed > 1 {
            return Err(format!("{} timers armed for one burst", newly_armed));
        }
        armed += newly_armed;

        // Idempotence probe at a quiet moment.
        now += 40;
        tracker.on_timer(now, &mut host).map_err(|e| e.msg)?;
        let repeat = rng.gen_range(-200.0..bottom);
        tracker.on_scroll(now, repeat, &mut host).map_err(|e| e.msg)?;
        let calls = host.calls.len();
        now += 40;
        tracker.on_scroll(now, repeat, &mut host).map_err(|e| e.msg)?;
        if host.calls.len() != calls {
            return Err("repeated offset caused style churn".to_string());
        }
        now += 40;
    }

    tracker.teardown(&mut host).map_err(|e| e.msg)?;
    let calls = host.calls.len();
    tracker.on_scroll(now + 10, 123.0, &mut host).map_err(|e| e.msg)?;
    tracker.on_timer(now + 20, &mut host).map_err(|e| e.msg)?;
    if host.calls.len() != calls {
        return Err("residual event after teardown mutated the page".to_string());
    }

    check_single_active(&host)?;
    Ok((tracker.stats.scroll_events, tracker.stats.recomputes))
}

fn main() {
    let seed = std::env::var("SEED")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(42u64);
    let views = std::env::var("VIEWS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2000usize);

    let mut rng = StdRng::seed_from_u64(seed);
    let started = Instant::now();
    let mut scroll_events = 0u64;
    let mut recomputes = 0u64;
    let mut failures = 0usize;

    for view in 0..views {
        match run_page_view(&mut rng, view) {
            Ok((events, recs)) => {
                scroll_events += events;
                recomputes += recs;
            }
            Err(msg) => {
                failures += 1;
                eprintln!("view {} FAILED: {}", view, msg);
            }
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    println!(
        "stress: views={} scroll_events={} recomputes={} elapsed={:.2}s failures={}",
        views, scroll_events, recomputes, elapsed, failures
    );
    if failures > 0 {
        std::process::exit(1);
    }
}
