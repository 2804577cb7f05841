//! scrollspy: headless active-section tracking for rendered documents.
//!
//! Given a document's headings and a generated navigation list mirroring
//! them, the tracker maintains a single source of truth for "which section
//! is the reader viewing" during scrolling and keeps exactly zero or one
//! navigation link highlighted, without degrading scroll responsiveness.
//!
//! The rendering pipeline, templating, and styling are external
//! collaborators: input is a heading snapshot, output is class toggles and
//! visibility changes applied through the [`platform::HostPage`] adapter.

pub mod config;
pub mod document;
pub mod events;
pub mod index;
pub mod logging;
pub mod platform;
pub mod throttle;
pub mod tracker;
