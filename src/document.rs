//! Document snapshot: the input contract with the rendering step.
//!
//! The build pipeline, templating, and styling are external collaborators;
//! all this crate consumes is a sequence of heading elements, each with a
//! stable identifier and a measurable vertical offset. Offline, that
//! sequence arrives as a JSON snapshot file.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One heading element as rendered: id attribute plus pixel offset from
/// the document top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub id: String,
    pub offset: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Page identifier (path or slug), carried through logs only.
    pub page: String,
    /// Headings in document order, top to bottom.
    pub headings: Vec<Heading>,
}

impl DocumentSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read snapshot {}", path.display()))?;
        let snap: DocumentSnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("bad snapshot json in {}", path.display()))?;
        Ok(snap)
    }
}

/// Why a heading was dropped during sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyId,
    DuplicateId,
    BadOffset,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::EmptyId => "empty_id",
            SkipReason::DuplicateId => "duplicate_id",
            SkipReason::BadOffset => "bad_offset",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Skipped {
    pub position: usize,
    pub id: String,
    pub reason: SkipReason,
}

/// Drop headings the tracker cannot use, keeping the rest. One bad heading
/// never aborts construction for the others; callers log the skips.
pub fn sanitize(headings: &[Heading]) -> (Vec<Heading>, Vec<Skipped>) {
    let mut kept = Vec::with_capacity(headings.len());
    let mut skipped = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (position, h) in headings.iter().enumerate() {
        let reason = if h.id.trim().is_empty() {
            Some(SkipReason::EmptyId)
        } else if !h.offset.is_finite() {
            Some(SkipReason::BadOffset)
        } else if !seen.insert(h.id.as_str()) {
            Some(SkipReason::DuplicateId)
        } else {
            None
        };
        match reason {
            Some(reason) => skipped.push(Skipped {
                position,
                id: h.id.clone(),
                reason,
            }),
            None => kept.push(h.clone()),
        }
    }

    (kept, skipped)
}

/// Content hash of a snapshot file, recorded in the replay audit trail so a
/// trace can be tied back to the exact document it was captured against.
pub fn snapshot_sha256(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(id: &str, offset: f64) -> Heading {
        Heading {
            id: id.to_string(),
            offset,
        }
    }

    #[test]
    fn test_sanitize_keeps_clean_headings() {
        let (kept, skipped) = sanitize(&[h("intro", 0.0), h("body", 500.0)]);
        assert_eq!(kept.len(), 2);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_sanitize_skips_individually() {
        let (kept, skipped) = sanitize(&[
            h("intro", 0.0),
            h("", 120.0),
            h("intro", 300.0),
            h("nan", f64::NAN),
            h("end", 900.0),
        ]);
        assert_eq!(
            kept.iter().map(|x| x.id.as_str()).collect::<Vec<_>>(),
            vec!["intro", "end"]
        );
        assert_eq!(skipped.len(), 3);
        assert_eq!(skipped[0].reason, SkipReason::EmptyId);
        assert_eq!(skipped[1].reason, SkipReason::DuplicateId);
        assert_eq!(skipped[2].reason, SkipReason::BadOffset);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snap = DocumentSnapshot {
            page: "/notes/ordering".to_string(),
            headings: vec![h("intro", 0.0), h("body", 500.0)],
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: DocumentSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.page, snap.page);
        assert_eq!(back.headings, snap.headings);
    }
}
