//! Structured logging for the section tracker.
//!
//! Design goals:
//! 1. Multi-level granularity (TRACE → FATAL)
//! 2. Domain-specific categories for filtering
//! 3. JSON-lines output suitable for replay correlation
//! 4. Per-run directories so traces from different page views never mix
//!
//! Nothing here surfaces to the end user; failures in this system are
//! silent degradations and the log stream is the only place they show.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

// =============================================================================
// Log levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Index,     // Snapshot ingestion, sanitization, index construction
    Scroll,    // Scroll samples, throttle gating
    Highlight, // Active-entry transitions, class toggles
    Nav,       // Container visibility, building/reveal signalling
    System,    // Page-view lifecycle: init, teardown, summaries
    Audit,     // Replay trail: snapshot hashes, event ordering
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Index => "index",
            Domain::Scroll => "scroll",
            Domain::Highlight => "highlight",
            Domain::Nav => "nav",
            Domain::System => "system",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
        }
        let events_path = run_dir.join("events.jsonl");
        let trace_path = run_dir.join("trace.jsonl");
        let manifest_path = run_dir.join("manifest.json");

        let _ = std::fs::write(
            manifest_path,
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );

        let events = File::create(events_path).unwrap_or_else(|err| {
            eprintln!("[log] failed to create events log: {}", err);
            File::create("/tmp/scrollspy-events.jsonl").expect("events fallback")
        });
        let trace = File::create(trace_path).unwrap_or_else(|err| {
            eprintln!("[log] failed to create trace log: {}", err);
            File::create("/tmp/scrollspy-trace.jsonl").expect("trace fallback")
        });

        RunContext {
            run_id,
            events: Mutex::new(BufWriter::new(events)),
            trace: Mutex::new(BufWriter::new(trace)),
        }
    })
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["page", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds (for replay correlation)
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }

    let ctx = ensure_run_context();
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("domain".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));

    let line = Value::Object(entry).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    println!("{}", line);
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Domain-specific logging helpers
// =============================================================================

pub fn log_index_built(page: &str, headings: usize, skipped: usize, build_ms: f64) {
    log(
        Level::Info,
        Domain::Index,
        "index_built",
        obj(&[
            ("page", v_str(page)),
            ("headings", json!(headings)),
            ("skipped", json!(skipped)),
            ("build_ms", v_num(build_ms)),
        ]),
    );
}

pub fn log_slow_build(page: &str, build_ms: f64, warn_ms: u64) {
    log(
        Level::Warn,
        Domain::Index,
        "slow_build",
        obj(&[
            ("page", v_str(page)),
            ("build_ms", v_num(build_ms)),
            ("threshold_ms", json!(warn_ms)),
        ]),
    );
}

pub fn log_heading_skipped(page: &str, position: usize, id: &str, reason: &str) {
    log(
        Level::Debug,
        Domain::Index,
        "heading_skipped",
        obj(&[
            ("page", v_str(page)),
            ("position", json!(position)),
            ("id", v_str(id)),
            ("reason", v_str(reason)),
        ]),
    );
}

pub fn log_nav_disabled(page: &str, usable: usize, min_headings: usize) {
    log(
        Level::Info,
        Domain::Nav,
        "nav_disabled",
        obj(&[
            ("page", v_str(page)),
            ("usable", json!(usable)),
            ("min_headings", json!(min_headings)),
        ]),
    );
}

pub fn log_scroll_sample(page: &str, offset: f64, gate: &str) {
    log(
        Level::Trace,
        Domain::Scroll,
        "scroll_sample",
        obj(&[
            ("page", v_str(page)),
            ("offset", v_num(offset)),
            ("gate", v_str(gate)),
        ]),
    );
}

pub fn log_highlight(page: &str, from: Option<&str>, to: Option<&str>, offset: f64) {
    log(
        Level::Debug,
        Domain::Highlight,
        "highlight_change",
        obj(&[
            ("page", v_str(page)),
            ("from", from.map(v_str).unwrap_or(Value::Null)),
            ("to", to.map(v_str).unwrap_or(Value::Null)),
            ("offset", v_num(offset)),
        ]),
    );
}

pub fn log_snapshot_audit(page: &str, path: &str, sha256: &str) {
    log(
        Level::Info,
        Domain::Audit,
        "snapshot_hash",
        obj(&[
            ("page", v_str(page)),
            ("path", v_str(path)),
            ("sha256", v_str(sha256)),
        ]),
    );
}

pub fn log_teardown(page: &str, stats_fields: &[(&str, u64)]) {
    let mut fields = obj(&[("page", v_str(page))]);
    for (k, v) in stats_fields {
        fields.insert(k.to_string(), json!(v));
    }
    log(Level::Info, Domain::System, "teardown", fields);
}

/// Session summary at the end of a page view.
pub fn log_session_summary(
    page: &str,
    scroll_events: u64,
    recomputes: u64,
    coalesced: u64,
    highlight_changes: u64,
) {
    log(
        Level::Info,
        Domain::System,
        "session_summary",
        obj(&[
            ("page", v_str(page)),
            ("scroll_events", json!(scroll_events)),
            ("recomputes", json!(recomputes)),
            ("coalesced", json!(coalesced)),
            ("highlight_changes", json!(highlight_changes)),
        ]),
    );
}
