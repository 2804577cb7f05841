//! Host-page adapter: the seam between the tracker and its environment.
//!
//! All environment branching lives outside the tracker. A platform adapter
//! resolves feature detection once into a read-only `Capabilities` value,
//! and every effect the tracker has on the page goes through the `HostPage`
//! trait, so the core stays a pure state machine.

use serde::{Deserialize, Serialize};

/// Opaque handle of one generated navigation link. Positional: the host
/// creates one link per usable heading, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink(pub usize);

/// Feature flags resolved once at startup and passed in read-only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Capabilities {
    /// Scroll listeners may be registered passive (never block scrolling).
    pub passive_listeners: bool,
    /// A native frame scheduler exists; without one the host falls back to
    /// plain interval timers for the trailing edge.
    pub frame_scheduler: bool,
    /// Reader asked for reduced motion; hosts may skip highlight animation.
    pub reduced_motion: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            passive_listeners: true,
            frame_scheduler: true,
            reduced_motion: false,
        }
    }
}

/// Everything the tracker is allowed to do to the page.
pub trait HostPage {
    /// Transient loading state, shown before the index build starts.
    fn nav_building(&mut self) -> Result<(), String>;
    /// Generate the navigation list, one link per id, in order.
    fn build_nav(&mut self, ids: &[&str]) -> Result<(), String>;
    /// Reveal the finished navigation container.
    fn reveal_nav(&mut self) -> Result<(), String>;
    /// Hide the container (disabled page: too few headings).
    fn hide_nav(&mut self) -> Result<(), String>;
    fn set_active(&mut self, link: NavLink) -> Result<(), String>;
    fn clear_active(&mut self, link: NavLink) -> Result<(), String>;
    fn attach_scroll_listener(&mut self, passive: bool) -> Result<(), String>;
    fn detach_scroll_listener(&mut self) -> Result<(), String>;
    /// Arm the single trailing-edge timer. At most one is ever in flight.
    fn arm_timer(&mut self, fire_at_ms: u64) -> Result<(), String>;
    fn cancel_timer(&mut self) -> Result<(), String>;
}

// Stub implementation to make integration explicit.
pub struct NullHost;

impl HostPage for NullHost {
    fn nav_building(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn build_nav(&mut self, _ids: &[&str]) -> Result<(), String> {
        Ok(())
    }

    fn reveal_nav(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn hide_nav(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn set_active(&mut self, _link: NavLink) -> Result<(), String> {
        Ok(())
    }

    fn clear_active(&mut self, _link: NavLink) -> Result<(), String> {
        Ok(())
    }

    fn attach_scroll_listener(&mut self, _passive: bool) -> Result<(), String> {
        Ok(())
    }

    fn detach_scroll_listener(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn arm_timer(&mut self, _fire_at_ms: u64) -> Result<(), String> {
        Ok(())
    }

    fn cancel_timer(&mut self) -> Result<(), String> {
        Ok(())
    }
}

/// Records every host call, for tests and the stress binary.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    NavBuilding,
    BuildNav(Vec<String>),
    RevealNav,
    HideNav,
    SetActive(NavLink),
    ClearActive(NavLink),
    AttachScroll { passive: bool },
    DetachScroll,
    ArmTimer { fire_at_ms: u64 },
    CancelTimer,
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently highlighted links, derived by replaying the call log.
    /// The tracker's single-active invariant means this has at most one
    /// element at any point.
    pub fn active_links(&self) -> Vec<NavLink> {
        let mut active = Vec::new();
        for call in &self.calls {
            match call {
                HostCall::SetActive(link) => active.push(*link),
                HostCall::ClearActive(link) => active.retain(|l| l != link),
                _ => {}
            }
        }
        active
    }

    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl HostPage for RecordingHost {
    fn nav_building(&mut self) -> Result<(), String> {
        self.calls.push(HostCall::NavBuilding);
        Ok(())
    }

    fn build_nav(&mut self, ids: &[&str]) -> Result<(), String> {
        self.calls
            .push(HostCall::BuildNav(ids.iter().map(|s| s.to_string()).collect()));
        Ok(())
    }

    fn reveal_nav(&mut self) -> Result<(), String> {
        self.calls.push(HostCall::RevealNav);
        Ok(())
    }

    fn hide_nav(&mut self) -> Result<(), String> {
        self.calls.push(HostCall::HideNav);
        Ok(())
    }

    fn set_active(&mut self, link: NavLink) -> Result<(), String> {
        self.calls.push(HostCall::SetActive(link));
        Ok(())
    }

    fn clear_active(&mut self, link: NavLink) -> Result<(), String> {
        self.calls.push(HostCall::ClearActive(link));
        Ok(())
    }

    fn attach_scroll_listener(&mut self, passive: bool) -> Result<(), String> {
        self.calls.push(HostCall::AttachScroll { passive });
        Ok(())
    }

    fn detach_scroll_listener(&mut self) -> Result<(), String> {
        self.calls.push(HostCall::DetachScroll);
        Ok(())
    }

    fn arm_timer(&mut self, fire_at_ms: u64) -> Result<(), String> {
        self.calls.push(HostCall::ArmTimer { fire_at_ms });
        Ok(())
    }

    fn cancel_timer(&mut self) -> Result<(), String> {
        self.calls.push(HostCall::CancelTimer);
        Ok(())
    }
}
