//! Initial-load sequencing
//!
//! The hash present at startup is captured before any data arrives,
//! resolved exactly once, and then waits for its notebook to show up in the
//! notebook list.

use crate::{parse_hash, NavAddress, PartialAddress};
use tracing::debug;

/// Where the startup navigation stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitialPhase {
    /// Hash captured, resolution not started.
    Captured(Option<String>),
    /// Resolution handed out, answer not back yet.
    Resolving,
    /// Resolved target waiting for its notebook to be listed.
    AwaitingNotebook(NavAddress),
    /// Startup navigation finished (or there was none).
    Ready,
}

/// What a notebook list means for the startup navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotebookReadiness {
    /// Nothing to do for startup navigation.
    Idle,
    /// The list is still empty; keep waiting.
    Waiting,
    /// The target notebook is listed; select it.
    Select(NavAddress),
    /// The list is loaded but lacks the notebook; give up.
    Missing(NavAddress),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitialNavigation {
    phase: InitialPhase,
}

impl InitialNavigation {
    /// Capture the startup hash (empty string counts as none).
    pub fn capture(hash: Option<&str>) -> Self {
        let hash = hash.filter(|h| !h.is_empty() && *h != "#").map(str::to_string);
        Self {
            phase: InitialPhase::Captured(hash),
        }
    }

    pub fn phase(&self) -> &InitialPhase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == InitialPhase::Ready
    }

    /// Hand out the captured target for resolution. Yields at most once;
    /// a missing or unparsable hash makes startup navigation ready instead.
    pub fn take_for_resolution(&mut self) -> Option<PartialAddress> {
        let InitialPhase::Captured(hash) = &self.phase else {
            return None;
        };
        match hash.as_deref().and_then(parse_hash) {
            Some(address) => {
                self.phase = InitialPhase::Resolving;
                Some(address.into())
            }
            None => {
                debug!("No initial navigation target");
                self.phase = InitialPhase::Ready;
                None
            }
        }
    }

    /// Record the resolution result.
    pub fn resolved(&mut self, target: Option<NavAddress>) {
        if self.phase != InitialPhase::Resolving {
            return;
        }
        self.phase = match target {
            Some(target) => InitialPhase::AwaitingNotebook(target),
            None => {
                debug!("Initial navigation target did not resolve");
                InitialPhase::Ready
            }
        };
    }

    /// Feed a notebook list.
    pub fn on_notebooks(&mut self, notebook_ids: &[String]) -> NotebookReadiness {
        let InitialPhase::AwaitingNotebook(target) = &self.phase else {
            return NotebookReadiness::Idle;
        };
        if notebook_ids.is_empty() {
            return NotebookReadiness::Waiting;
        }
        let target = target.clone();
        self.phase = InitialPhase::Ready;
        if notebook_ids.iter().any(|id| *id == target.notebook_id) {
            NotebookReadiness::Select(target)
        } else {
            NotebookReadiness::Missing(target)
        }
    }

    /// Give up on startup navigation.
    pub fn finish(&mut self) {
        self.phase = InitialPhase::Ready;
    }
}
