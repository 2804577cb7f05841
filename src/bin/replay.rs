//! Replay a captured page-view trace from stdin and print every highlight
//! transition. JSON-lines input, one PageEvent per line; bad lines are
//! reported and skipped so a partial trace still replays.

use std::io::{self, BufRead};

use scrollspy::config::TrackerConfig;
use scrollspy::events::PageEvent;
use scrollspy::platform::{Capabilities, HostCall, RecordingHost};
use scrollspy::tracker::SectionTracker;

fn main() {
    let stdin = io::stdin();
    let mut tracker = SectionTracker::new(TrackerConfig::from_env(), Capabilities::default());
    let mut host = RecordingHost::new();
    let mut printed = 0usize;

    for line in stdin.lock().lines().map_while(Result::ok) {
        if line.trim().is_empty() {
            continue;
        }
        let event: PageEvent = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(err) => {
                eprintln!("bad event json: {}", err);
                continue;
            }
        };

        if let Err(err) = tracker.apply_event(&event, &mut host) {
            eprintln!("transition rejected: {}", err.msg);
            continue;
        }

        for call in &host.calls[printed..] {
            match call {
                HostCall::SetActive(link) => println!("active -> link {}", link.0),
                HostCall::ClearActive(link) => println!("active cleared <- link {}", link.0),
                HostCall::ArmTimer { fire_at_ms } => {
                    println!("trailing timer armed for t={}ms", fire_at_ms)
                }
                HostCall::HideNav => println!("nav hidden (disabled)"),
                HostCall::RevealNav => println!("nav revealed"),
                HostCall::DetachScroll => println!("listener detached"),
                _ => {}
            }
        }
        printed = host.calls.len();
    }

    let stats = tracker.stats;
    println!(
        "replay done: state={} scroll_events={} recomputes={} coalesced={} highlight_changes={}",
        tracker.state().as_str(),
        stats.scroll_events,
        stats.recomputes,
        stats.coalesced,
        stats.highlight_changes,
    );
}
