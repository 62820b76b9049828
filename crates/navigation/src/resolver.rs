//! Race-safe resolution of navigation targets
//!
//! A resolution is tagged with the context's version when it starts. By the
//! time the lookup answers, a newer navigation may have begun; the answer is
//! then dropped. Admitted targets become the pending target that the
//! selection cascade works toward.

use crate::{HierarchyLookup, NavAddress, PartialAddress, Specificity};
use tracing::{debug, warn};

/// Proof that a resolution was started at a given version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolutionTicket(u64);

impl ResolutionTicket {
    pub fn version(&self) -> u64 {
        self.0
    }
}

/// What happened to a finished resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The target became the pending target.
    Applied(NavAddress),
    /// A newer resolution started after this one.
    Stale,
    /// The lookup found nothing (or failed).
    Unresolved,
    /// A more specific consistent target is already pending.
    Rejected,
}

impl ResolutionOutcome {
    pub fn applied(&self) -> Option<&NavAddress> {
        match self {
            ResolutionOutcome::Applied(address) => Some(address),
            _ => None,
        }
    }
}

/// Pending navigation state plus the version counter guarding it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationContext {
    version: u64,
    pending: Option<NavAddress>,
}

impl NavigationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn pending(&self) -> Option<&NavAddress> {
        self.pending.as_ref()
    }

    pub fn pending_specificity(&self) -> Specificity {
        self.pending
            .as_ref()
            .map(NavAddress::specificity)
            .unwrap_or(Specificity::None)
    }

    /// Start a resolution. Every earlier ticket becomes stale.
    pub fn begin(&mut self) -> ResolutionTicket {
        self.version += 1;
        ResolutionTicket(self.version)
    }

    /// Invalidate in-flight resolutions without starting a new one.
    pub fn supersede(&mut self) {
        self.version += 1;
    }

    pub fn is_current(&self, ticket: ResolutionTicket) -> bool {
        ticket.0 == self.version
    }

    /// Apply the result of a resolution started with `ticket`.
    pub fn complete(
        &mut self,
        ticket: ResolutionTicket,
        resolved: Option<NavAddress>,
    ) -> ResolutionOutcome {
        if !self.is_current(ticket) {
            debug!(
                "Discarding stale resolution v{} (latest v{})",
                ticket.0, self.version
            );
            return ResolutionOutcome::Stale;
        }
        let Some(target) = resolved else {
            return ResolutionOutcome::Unresolved;
        };
        if self.admit(target.clone()) {
            ResolutionOutcome::Applied(target)
        } else {
            ResolutionOutcome::Rejected
        }
    }

    /// Offer a new pending target.
    ///
    /// The target replaces the current one unless it is strictly less
    /// specific and consistent with it; a page target must not be clobbered
    /// by the notebook-level echo of its own navigation.
    pub fn admit(&mut self, target: NavAddress) -> bool {
        if let Some(current) = &self.pending {
            if target.specificity() < current.specificity() && target.is_consistent_with(current)
            {
                debug!(
                    "Keeping pending {:?} target over weaker {:?}",
                    current.specificity(),
                    target.specificity()
                );
                return false;
            }
        }
        debug!("Pending navigation target: {:?}", target);
        self.pending = Some(target);
        true
    }

    /// Drop the pending target.
    pub fn clear_pending(&mut self) -> Option<NavAddress> {
        self.pending.take()
    }
}

/// Expands partial addresses through a [`HierarchyLookup`].
#[derive(Debug)]
pub struct NavigationResolver<L> {
    lookup: L,
}

impl<L: HierarchyLookup> NavigationResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Resolve a partial address into a full one.
    ///
    /// An address with a notebook passes through unchanged. Otherwise a page
    /// id is looked up first, then a section id. Not-found and lookup
    /// failures both yield `None`.
    pub async fn resolve(&self, partial: &PartialAddress) -> Option<NavAddress> {
        if let Some(notebook_id) = partial.notebook_id.as_ref().filter(|id| !id.is_empty()) {
            return Some(NavAddress {
                notebook_id: notebook_id.clone(),
                section_id: partial.section_id.clone(),
                page_id: partial.page_id.clone(),
                block_id: partial.block_id.clone(),
            });
        }

        if let Some(page_id) = &partial.page_id {
            return match self.lookup.lookup_page_ancestry(page_id).await {
                Ok(Some(ancestry)) => Some(NavAddress {
                    notebook_id: ancestry.notebook_id,
                    section_id: Some(ancestry.section_id),
                    page_id: Some(page_id.clone()),
                    block_id: partial.block_id.clone(),
                }),
                Ok(None) => {
                    debug!("Page {} not found", page_id);
                    None
                }
                Err(e) => {
                    warn!("Page lookup for {} failed: {}", page_id, e);
                    None
                }
            };
        }

        if let Some(section_id) = &partial.section_id {
            return match self.lookup.lookup_section_ancestry(section_id).await {
                Ok(Some(ancestry)) => Some(NavAddress::section(ancestry.notebook_id, section_id.clone())),
                Ok(None) => {
                    debug!("Section {} not found", section_id);
                    None
                }
                Err(e) => {
                    warn!("Section lookup for {} failed: {}", section_id, e);
                    None
                }
            };
        }

        None
    }
}
