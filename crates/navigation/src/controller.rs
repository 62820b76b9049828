//! Navigation controller
//!
//! Owns the pending-navigation context, the hash sync and the startup
//! sequencer, and walks the active selection from notebook to section to
//! page as the host reports each list loading.

use crate::{
    build_hash, parse_hash, ActiveSelection, HashHistory, HashSync, HierarchyLookup,
    InitialNavigation, NavAddress, NavigationContext, NavigationResolver, NotebookReadiness,
    PartialAddress, ResolutionOutcome, ResolutionTicket,
};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A resolution issued by [`NavigationController`]. Owns what the lookup
/// needs, so it can run while the controller keeps handling events.
#[derive(Debug)]
pub struct NavigationRequest<L> {
    resolver: Arc<NavigationResolver<L>>,
    ticket: ResolutionTicket,
    partial: PartialAddress,
    initial: bool,
}

impl<L: HierarchyLookup> NavigationRequest<L> {
    pub fn ticket(&self) -> ResolutionTicket {
        self.ticket
    }

    pub fn partial(&self) -> &PartialAddress {
        &self.partial
    }

    /// Run the lookup. Hand the result to [`NavigationController::apply`].
    pub async fn resolve(self) -> ResolvedNavigation {
        let resolved = self.resolver.resolve(&self.partial).await;
        ResolvedNavigation {
            ticket: self.ticket,
            resolved,
            initial: self.initial,
        }
    }
}

/// Lookup result waiting to be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedNavigation {
    ticket: ResolutionTicket,
    resolved: Option<NavAddress>,
    initial: bool,
}

impl ResolvedNavigation {
    pub fn ticket(&self) -> ResolutionTicket {
        self.ticket
    }

    pub fn address(&self) -> Option<&NavAddress> {
        self.resolved.as_ref()
    }
}

/// Progress of the pending target through the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CascadeStep {
    /// The deepest requested level is selected.
    Reached,
    /// A child list for the next level has not loaded yet.
    Waiting,
    /// The next level's list loaded without the requested child.
    Abandoned,
}

/// Drives hash-based navigation for one editor window.
#[derive(Debug)]
pub struct NavigationController<L, H> {
    resolver: Arc<NavigationResolver<L>>,
    context: NavigationContext,
    hash_sync: HashSync<H>,
    initial: InitialNavigation,
    active: ActiveSelection,
    notebooks: Vec<String>,
    /// Last loaded section list and the notebook it belongs to.
    sections: Option<(String, Vec<String>)>,
    /// Last loaded page list and the section it belongs to.
    pages: Option<(String, Vec<String>)>,
    reveal_block: Option<String>,
}

impl<L: HierarchyLookup, H: HashHistory> NavigationController<L, H> {
    /// Create a controller, capturing the hash present in `history` as the
    /// startup target.
    pub fn new(lookup: L, history: H) -> Self {
        let hash = history.current();
        Self {
            resolver: Arc::new(NavigationResolver::new(lookup)),
            context: NavigationContext::new(),
            hash_sync: HashSync::new(history),
            initial: InitialNavigation::capture(Some(&hash)),
            active: ActiveSelection::default(),
            notebooks: Vec::new(),
            sections: None,
            pages: None,
            reveal_block: None,
        }
    }

    pub fn context(&self) -> &NavigationContext {
        &self.context
    }

    pub fn resolver(&self) -> &NavigationResolver<L> {
        &self.resolver
    }

    pub fn active(&self) -> &ActiveSelection {
        &self.active
    }

    pub fn hash_sync(&self) -> &HashSync<H> {
        &self.hash_sync
    }

    pub fn hash_sync_mut(&mut self) -> &mut HashSync<H> {
        &mut self.hash_sync
    }

    pub fn initial(&self) -> &InitialNavigation {
        &self.initial
    }

    pub fn is_initial_ready(&self) -> bool {
        self.initial.is_ready()
    }

    /// The block a finished deep link asked to reveal, if any.
    pub fn take_reveal_block(&mut self) -> Option<String> {
        self.reveal_block.take()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Start resolving the startup hash. Only the first call yields a request.
    pub fn begin_start(&mut self) -> Option<NavigationRequest<L>> {
        let partial = self.initial.take_for_resolution()?;
        Some(self.issue(partial, true))
    }

    /// Start resolving a (possibly partial) address. The returned request
    /// does not borrow the controller, so several can be in flight.
    pub fn request(&mut self, partial: PartialAddress) -> NavigationRequest<L> {
        self.issue(partial, false)
    }

    /// Handle a hash-change event. Events caused by our own pushes and
    /// hashes without a notebook yield no request.
    pub fn begin_hash_change(&mut self, hash: &str) -> Option<NavigationRequest<L>> {
        if self.hash_sync.observe_hash_change() {
            trace!("Ignoring self-triggered hash change {}", hash);
            return None;
        }
        let Some(address) = parse_hash(hash) else {
            debug!("Ignoring hash without notebook: {}", hash);
            return None;
        };
        Some(self.request(address.into()))
    }

    fn issue(&mut self, partial: PartialAddress, initial: bool) -> NavigationRequest<L> {
        let ticket = self.context.begin();
        trace!("Navigation v{} started: {:?}", ticket.version(), partial);
        NavigationRequest {
            resolver: Arc::clone(&self.resolver),
            ticket,
            partial,
            initial,
        }
    }

    /// Apply a finished resolution. Answers of superseded requests are
    /// dropped as [`ResolutionOutcome::Stale`].
    pub fn apply(&mut self, resolution: ResolvedNavigation) -> ResolutionOutcome {
        let outcome = self.context.complete(resolution.ticket, resolution.resolved);
        debug!("Navigation v{} finished: {:?}", resolution.ticket.version(), outcome);
        if resolution.initial {
            self.initial.resolved(outcome.applied().cloned());
            // Notebooks may have arrived while the lookup was in flight
            if !self.notebooks.is_empty() {
                self.check_initial_notebooks();
            }
            self.cascade();
        } else if outcome.applied().is_some() {
            self.cascade();
        }
        outcome
    }

    /// Resolve the startup hash in one go.
    pub async fn start(&mut self) -> ResolutionOutcome {
        let Some(request) = self.begin_start() else {
            return ResolutionOutcome::Unresolved;
        };
        let resolution = request.resolve().await;
        self.apply(resolution)
    }

    /// Resolve and apply one address. Hosts that must keep handling events
    /// during the lookup use [`request`](Self::request) and
    /// [`apply`](Self::apply) instead.
    pub async fn navigate(&mut self, partial: &PartialAddress) -> ResolutionOutcome {
        let resolution = self.request(partial.clone()).resolve().await;
        self.apply(resolution)
    }

    /// [`begin_hash_change`](Self::begin_hash_change) followed by the lookup.
    pub async fn on_hash_change(&mut self, hash: &str) -> Option<ResolutionOutcome> {
        let request = self.begin_hash_change(hash)?;
        let resolution = request.resolve().await;
        Some(self.apply(resolution))
    }

    // =========================================================================
    // Data events
    // =========================================================================

    /// The notebook list (re)loaded. Returns true if the selection changed.
    pub fn on_notebooks_loaded(&mut self, notebook_ids: Vec<String>) -> bool {
        self.notebooks = notebook_ids;
        self.check_initial_notebooks();
        self.cascade()
    }

    /// The sections of `notebook_id` loaded.
    pub fn on_sections_loaded(&mut self, notebook_id: &str, section_ids: Vec<String>) -> bool {
        self.sections = Some((notebook_id.to_string(), section_ids));
        self.cascade()
    }

    /// The pages of `section_id` loaded.
    pub fn on_pages_loaded(&mut self, section_id: &str, page_ids: Vec<String>) -> bool {
        self.pages = Some((section_id.to_string(), page_ids));
        self.cascade()
    }

    /// The host's selection changed. Writes the matching hash: pushed when
    /// the user made the change, replaced otherwise. A user choice also
    /// abandons any pending navigation. Returns true if the hash was written.
    pub fn on_selection_changed(&mut self, selection: ActiveSelection, user_initiated: bool) -> bool {
        if user_initiated {
            if let Some(dropped) = self.context.clear_pending() {
                debug!("User selection overrides pending target {:?}", dropped);
            }
            self.context.supersede();
        }
        self.active = selection;
        match self.active.to_address() {
            Some(address) => self.hash_sync.write(&build_hash(&address), user_initiated),
            None => false,
        }
    }

    fn check_initial_notebooks(&mut self) {
        if let NotebookReadiness::Missing(target) = self.initial.on_notebooks(&self.notebooks) {
            warn!("Initial notebook {} is not in the notebook list", target.notebook_id);
            if self.context.pending() == Some(&target) {
                self.context.clear_pending();
            }
        }
    }

    // =========================================================================
    // Cascade
    // =========================================================================

    /// Move the active selection toward the pending target as far as the
    /// loaded lists allow. Returns true if the selection changed.
    fn cascade(&mut self) -> bool {
        let Some(target) = self.context.pending().cloned() else {
            return false;
        };
        if !self.notebooks.iter().any(|id| *id == target.notebook_id) {
            return false;
        }

        let before = self.active.clone();
        if self.active.notebook_id.as_deref() != Some(target.notebook_id.as_str()) {
            self.active = ActiveSelection {
                notebook_id: Some(target.notebook_id.clone()),
                ..Default::default()
            };
        }

        match self.descend(&target) {
            CascadeStep::Reached => {
                debug!("Navigation target reached: {:?}", target);
                self.context.clear_pending();
                self.reveal_block = target.block_id.clone();
                self.hash_sync.write(&build_hash(&target), false);
            }
            CascadeStep::Abandoned => {
                self.context.clear_pending();
                self.write_active_hash();
            }
            CascadeStep::Waiting => {
                if self.active != before {
                    self.write_active_hash();
                }
            }
        }
        self.active != before
    }

    fn write_active_hash(&mut self) {
        if let Some(address) = self.active.to_address() {
            self.hash_sync.write(&build_hash(&address), false);
        }
    }

    fn descend(&mut self, target: &NavAddress) -> CascadeStep {
        let Some(section_id) = &target.section_id else {
            return CascadeStep::Reached;
        };
        match Self::contains(&self.sections, &target.notebook_id, section_id) {
            None => return CascadeStep::Waiting,
            Some(false) => {
                warn!("Section {} not found in notebook {}", section_id, target.notebook_id);
                return CascadeStep::Abandoned;
            }
            Some(true) => {}
        }
        if self.active.section_id.as_ref() != Some(section_id) {
            self.active.section_id = Some(section_id.clone());
            self.active.page_id = None;
        }

        let Some(page_id) = &target.page_id else {
            return CascadeStep::Reached;
        };
        match Self::contains(&self.pages, section_id, page_id) {
            None => CascadeStep::Waiting,
            Some(false) => {
                warn!("Page {} not found in section {}", page_id, section_id);
                CascadeStep::Abandoned
            }
            Some(true) => {
                self.active.page_id = Some(page_id.clone());
                CascadeStep::Reached
            }
        }
    }

    /// Whether the loaded child list of `parent` has `child`; `None` if the
    /// loaded list belongs to another parent (or nothing loaded yet).
    fn contains(list: &Option<(String, Vec<String>)>, parent: &str, child: &str) -> Option<bool> {
        match list {
            Some((owner, ids)) if owner == parent => Some(ids.iter().any(|id| id == child)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryHierarchy, InMemoryHistory};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn hierarchy() -> InMemoryHierarchy {
        let mut h = InMemoryHierarchy::new();
        h.add_section("nb1", "s1")
            .add_section("nb1", "s2")
            .add_page("s1", "p1")
            .add_page("s2", "p2");
        h
    }

    fn controller(hash: &str) -> NavigationController<InMemoryHierarchy, InMemoryHistory> {
        NavigationController::new(hierarchy(), InMemoryHistory::with_hash(hash))
    }

    #[tokio::test]
    async fn test_initial_hash_cascades_to_page() {
        let mut nav = controller("#nb=nb1&sec=s1&pg=p1&block=b9");
        assert!(nav.start().await.applied().is_some());
        assert!(!nav.is_initial_ready());

        // Still loading
        assert!(!nav.on_notebooks_loaded(Vec::new()));
        assert!(!nav.is_initial_ready());

        assert!(nav.on_notebooks_loaded(ids(&["nb0", "nb1"])));
        assert!(nav.is_initial_ready());
        assert_eq!(nav.active().notebook_id.as_deref(), Some("nb1"));

        assert!(nav.on_sections_loaded("nb1", ids(&["s1", "s2"])));
        assert_eq!(nav.active().section_id.as_deref(), Some("s1"));

        assert!(nav.on_pages_loaded("s1", ids(&["p1"])));
        assert_eq!(nav.active(), &ActiveSelection::new(Some("nb1"), Some("s1"), Some("p1")));
        assert_eq!(nav.context().pending(), None);
        assert_eq!(nav.take_reveal_block().as_deref(), Some("b9"));
    }

    #[tokio::test]
    async fn test_start_resolves_only_once() {
        let mut nav = controller("#nb=nb1");
        assert!(nav.start().await.applied().is_some());
        assert_eq!(nav.start().await, ResolutionOutcome::Unresolved);
    }

    #[tokio::test]
    async fn test_missing_initial_notebook_marks_ready() {
        let mut nav = controller("#nb=gone&sec=s1");
        nav.start().await;
        assert!(!nav.on_notebooks_loaded(ids(&["nb1"])));
        assert!(nav.is_initial_ready());
        assert_eq!(nav.context().pending(), None);
    }

    #[tokio::test]
    async fn test_no_initial_hash_is_ready() {
        let mut nav = controller("");
        assert_eq!(nav.start().await, ResolutionOutcome::Unresolved);
        assert!(nav.is_initial_ready());
    }

    #[tokio::test]
    async fn test_page_link_resolves_and_writes_full_hash() {
        let mut nav = controller("");
        nav.start().await;
        nav.on_notebooks_loaded(ids(&["nb1"]));

        let outcome = nav.navigate(&PartialAddress::page("p2")).await;
        assert_eq!(outcome, ResolutionOutcome::Applied(NavAddress::page("nb1", "s2", "p2")));
        nav.on_sections_loaded("nb1", ids(&["s1", "s2"]));
        nav.on_pages_loaded("s2", ids(&["p2"]));

        assert_eq!(nav.active().page_id.as_deref(), Some("p2"));
        assert_eq!(nav.hash_sync().current(), "#nb=nb1&sec=s2&pg=p2");
    }

    #[tokio::test]
    async fn test_page_lists_of_other_sections_are_ignored() {
        let mut nav = controller("#nb=nb1&sec=s1&pg=p1");
        nav.start().await;
        nav.on_notebooks_loaded(ids(&["nb1"]));
        nav.on_sections_loaded("nb1", ids(&["s1"]));

        assert!(!nav.on_pages_loaded("s2", ids(&["p2"])));
        assert!(nav.context().pending().is_some());
    }

    #[tokio::test]
    async fn test_missing_section_abandons_target() {
        let mut nav = controller("#nb=nb1&sec=deleted");
        nav.start().await;
        nav.on_notebooks_loaded(ids(&["nb1"]));
        nav.on_sections_loaded("nb1", ids(&["s1"]));
        assert_eq!(nav.context().pending(), None);
        assert_eq!(nav.active(), &ActiveSelection::new(Some("nb1"), None, None));
        assert_eq!(nav.hash_sync().current(), "#nb=nb1");
    }

    #[tokio::test]
    async fn test_intermediate_cascade_steps_replace_hash() {
        let mut nav = controller("#nb=nb1&sec=s2&pg=p2");
        nav.start().await;
        nav.on_notebooks_loaded(ids(&["nb1"]));
        nav.on_sections_loaded("nb1", ids(&["s1", "s2"]));
        assert_eq!(nav.hash_sync().history().entries(), ["#nb=nb1&sec=s2"]);

        // The page was deleted: the hash follows the selection that remains
        nav.on_pages_loaded("s2", Vec::new());
        assert_eq!(nav.context().pending(), None);
        assert_eq!(nav.hash_sync().history().entries(), ["#nb=nb1&sec=s2"]);
        assert_eq!(nav.hash_sync().pending_self_events(), 0);
    }

    #[tokio::test]
    async fn test_split_hash_change_skips_self_triggered_events() {
        let mut nav = controller("");
        nav.start().await;
        nav.on_selection_changed(ActiveSelection::new(Some("nb1"), None, None), true);
        assert!(nav.begin_hash_change("#nb=nb1").is_none());

        let request = nav.begin_hash_change("#nb=nb1&sec=s1").unwrap();
        assert_eq!(request.ticket().version(), nav.context().version());
        let resolution = request.resolve().await;
        assert_eq!(resolution.address(), Some(&NavAddress::section("nb1", "s1")));
        assert!(nav.apply(resolution).applied().is_some());
    }

    #[tokio::test]
    async fn test_self_triggered_hash_change_is_ignored() {
        let mut nav = controller("");
        nav.start().await;
        let selection = ActiveSelection::new(Some("nb1"), Some("s1"), None);
        assert!(nav.on_selection_changed(selection, true));
        assert_eq!(nav.hash_sync().current(), "#nb=nb1&sec=s1");

        // The host echoes our push back
        assert_eq!(nav.on_hash_change("#nb=nb1&sec=s1").await, None);

        // A genuine external change navigates
        let outcome = nav.on_hash_change("#nb=nb1&sec=s2").await;
        assert_eq!(outcome, Some(ResolutionOutcome::Applied(NavAddress::section("nb1", "s2"))));
    }

    #[tokio::test]
    async fn test_user_selection_drops_pending_target() {
        let mut nav = controller("#nb=nb1&sec=s1&pg=p1");
        nav.start().await;
        assert!(nav.context().pending().is_some());

        nav.on_selection_changed(ActiveSelection::new(Some("nb2"), None, None), true);
        assert_eq!(nav.context().pending(), None);
        assert!(!nav.on_notebooks_loaded(ids(&["nb1", "nb2"])));
        assert_eq!(nav.active().notebook_id.as_deref(), Some("nb2"));
    }

    #[test]
    fn test_programmatic_selection_replaces_hash() {
        let mut nav = controller("#nb=nb1");
        nav.on_selection_changed(ActiveSelection::new(Some("nb1"), Some("s1"), None), false);
        assert_eq!(nav.hash_sync().history().entries(), ["#nb=nb1&sec=s1"]);
        assert_eq!(nav.hash_sync().pending_self_events(), 0);
    }
}
