//! Navigation index: ordered heading entries and the activation scan.
//!
//! Built once per page view from the sanitized document snapshot and
//! immutable afterwards. Ordering is significant: the linear last-match
//! scan is what gives the closest-preceding rule and its tie-break (two
//! headings at the same offset resolve to the later one in document order).

use crate::document::Heading;
use crate::platform::NavLink;

#[derive(Debug, Clone)]
pub struct NavEntry {
    pub id: String,
    pub offset: f64,
    /// Handle of the generated navigation link on the host page.
    pub link: NavLink,
}

#[derive(Debug, Clone)]
pub struct NavIndex {
    entries: Vec<NavEntry>,
}

impl NavIndex {
    /// Pair each heading with its nav link handle, preserving document
    /// order. Link handles are positional: the host generates one link per
    /// usable heading, in the same order.
    pub fn build(headings: &[Heading]) -> Self {
        let entries = headings
            .iter()
            .enumerate()
            .map(|(i, h)| NavEntry {
                id: h.id.clone(),
                offset: h.offset,
                link: NavLink(i),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, i: usize) -> Option<&NavEntry> {
        self.entries.get(i)
    }

    pub fn entries(&self) -> &[NavEntry] {
        &self.entries
    }

    /// Closest-preceding scan: the active entry is the LAST one whose
    /// offset is at or above the activation line (scroll offset plus
    /// look-ahead). A heading stays active until the reader scrolls past
    /// the next one, not until scrolled nearest to another. Above the
    /// first heading there is no match.
    pub fn locate(&self, scroll_offset: f64, lookahead_px: f64) -> Option<usize> {
        let line = scroll_offset + lookahead_px;
        let mut hit = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.offset <= line {
                hit = Some(i);
            }
        }
        hit
    }
}
