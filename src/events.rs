//! Page-view events, in the JSON-lines replay format.
//!
//! A captured trace is a sequence of these, one per line, applied in input
//! order. Scroll and timer events carry the page clock in milliseconds so
//! throttle behavior replays deterministically.

use serde::{Deserialize, Serialize};

use crate::document::DocumentSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageEvent {
    /// Document rendered; headings are measurable.
    Ready { snapshot: DocumentSnapshot },
    Scroll { ts_ms: u64, offset: f64 },
    /// The host's trailing-edge throttle timer fired.
    TimerFired { ts_ms: u64 },
    Unload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_line_round_trip() {
        let line = r#"{"type":"Scroll","ts_ms":120,"offset":642.5}"#;
        let evt: PageEvent = serde_json::from_str(line).unwrap();
        match evt {
            PageEvent::Scroll { ts_ms, offset } => {
                assert_eq!(ts_ms, 120);
                assert!((offset - 642.5).abs() < 1e-9);
            }
            other => panic!("expected Scroll, got {:?}", other),
        }
    }

    #[test]
    fn test_unload_has_no_payload() {
        let evt: PageEvent = serde_json::from_str(r#"{"type":"Unload"}"#).unwrap();
        assert!(matches!(evt, PageEvent::Unload));
    }
}
