use serde::{Deserialize, Serialize};

/// Policy for scroll positions above the first heading.
///
/// The activation scan has no closest-preceding match there, so the tracker
/// must decide between showing nothing and pinning the first entry. We clear
/// the highlight: claiming the reader is in a section whose heading is still
/// below the activation line would be wrong more often than it is helpful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AboveFirst {
    NoneActive,
    FirstActive,
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Fewer usable headings than this disables the feature outright.
    pub min_headings: usize,
    /// Activation line: pixels ahead of the viewport top that count as "in view".
    pub lookahead_px: f64,
    /// Throttle interval; one recompute per interval (16ms = 60/s ceiling).
    pub throttle_ms: u64,
    /// Index builds slower than this get a warn log.
    pub build_warn_ms: u64,
    pub above_first: AboveFirst,
    pub snapshot_path: String,
    pub trace_path: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_headings: 2,
            lookahead_px: 80.0,
            throttle_ms: 16,
            build_warn_ms: 50,
            above_first: AboveFirst::NoneActive,
            snapshot_path: "data/snapshot.json".to_string(),
            trace_path: "data/trace.jsonl".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_headings: std::env::var("TOC_MIN_HEADINGS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_headings),
            lookahead_px: std::env::var("TOC_LOOKAHEAD_PX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lookahead_px),
            throttle_ms: std::env::var("TOC_THROTTLE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.throttle_ms),
            build_warn_ms: std::env::var("TOC_BUILD_WARN_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.build_warn_ms),
            above_first: match std::env::var("TOC_ABOVE_FIRST").as_deref() {
                Ok("first_active") => AboveFirst::FirstActive,
                _ => defaults.above_first,
            },
            snapshot_path: std::env::var("SNAPSHOT_PATH").unwrap_or(defaults.snapshot_path),
            trace_path: std::env::var("TRACE_PATH").unwrap_or(defaults.trace_path),
        }
    }
}
