//! Command execution engine

use crate::{
    reduce, AiInsertPayload, Command, ContentPlacer, Decoration, EditorSettings, FindMeta,
    FindState, IdentityAssigner, Key, KeyOutcome, ListKeymap, PlacementOutcome, Result,
    Transaction,
};
use doc_model::{BlockId, DocumentTree, IdGenerator, Range, Selection, UuidGenerator};

/// The main editing engine that manages document state and transaction
/// dispatch
pub struct EditingEngine {
    /// Current document tree
    tree: DocumentTree,
    /// Current selection
    selection: Selection,
    /// Current search
    find: FindState,
    settings: EditorSettings,
    identity: IdentityAssigner,
    ids: Box<dyn IdGenerator>,
    keymap: ListKeymap,
    /// Selection the view should scroll to, until taken
    scroll_request: Option<Selection>,
}

impl EditingEngine {
    /// Create a new editing engine with an empty document
    pub fn new() -> Self {
        Self::with_tree(DocumentTree::default())
    }

    /// Create an editing engine with a specific document tree
    pub fn with_tree(tree: DocumentTree) -> Self {
        Self::with_parts(tree, EditorSettings::default(), Box::new(UuidGenerator))
    }

    /// Create an editing engine from all of its parts.
    ///
    /// The tree is stabilized immediately so every block has an identity
    /// before the first edit.
    pub fn with_parts(
        mut tree: DocumentTree,
        settings: EditorSettings,
        mut ids: Box<dyn IdGenerator>,
    ) -> Self {
        let identity = settings.identity_assigner();
        let fixes = identity.stabilize(&mut tree, ids.as_mut());
        if fixes > 0 {
            tracing::debug!(fixes, "stabilized identities on load");
        }
        let selection = first_text_position(&tree)
            .map(Selection::collapsed)
            .unwrap_or_default();

        Self {
            tree,
            selection,
            find: FindState::default(),
            settings,
            identity,
            ids,
            keymap: ListKeymap::new(),
            scroll_request: None,
        }
    }

    /// Load a document from its JSON serialization
    pub fn from_json(json: &str, settings: EditorSettings, ids: Box<dyn IdGenerator>) -> Result<Self> {
        let tree = DocumentTree::from_json(json)?;
        Ok(Self::with_parts(tree, settings, ids))
    }

    /// Get the current document tree
    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    /// Serialize the current document
    pub fn to_json(&self) -> Result<String> {
        Ok(self.tree.to_json()?)
    }

    /// Get the current selection
    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn find_state(&self) -> &FindState {
        &self.find
    }

    /// Take the pending scroll-into-view request, if any
    pub fn take_scroll_request(&mut self) -> Option<Selection> {
        self.scroll_request.take()
    }

    /// Execute a command
    pub fn execute(&mut self, command: &dyn Command) -> Result<()> {
        let tx = command.apply(&self.tree, &self.selection)?;
        tracing::debug!(command = command.display_name(), "executing command");
        self.dispatch(tx);
        Ok(())
    }

    /// Apply a transaction, then the identity pass's follow-up if the
    /// content changed
    pub fn dispatch(&mut self, tx: Transaction) {
        let fix = self
            .identity
            .append_transaction(&[&tx], &tx.tree, self.ids.as_mut());
        self.apply(tx);
        if let Some(fix) = fix {
            self.apply(fix);
        }
    }

    fn apply(&mut self, tx: Transaction) {
        let Transaction {
            tree,
            selection,
            doc_changed,
            meta,
        } = tx;
        self.tree = tree;
        self.selection = selection.clamp(self.tree.size());
        self.find = reduce(
            &self.find,
            meta.find.as_ref(),
            &self.tree,
            doc_changed,
            &self.settings.find_options(),
        );

        // Moving through matches selects the match and brings it into view
        let selects_match = matches!(
            meta.find,
            Some(FindMeta::SetQuery(_)) | Some(FindMeta::Next) | Some(FindMeta::Prev)
        );
        let mut scroll = meta.scroll_into_view;
        if selects_match {
            if let Some(selection) = self.find.current_selection() {
                self.selection = selection;
                scroll = true;
            }
        }
        if scroll {
            self.scroll_request = Some(self.selection);
        }

        tracing::debug!(
            doc_changed,
            identity_pass = meta.identity_pass,
            size = self.tree.size(),
            "applied transaction"
        );
    }

    /// Offer a key to the list keymap. Returns whether it was handled.
    pub fn handle_key(&mut self, key: Key) -> bool {
        match self.keymap.handle(key, &self.tree, &self.selection) {
            KeyOutcome::Handled(tx) => {
                self.dispatch(tx);
                true
            }
            KeyOutcome::Unhandled => false,
        }
    }

    /// Place AI-generated content into the document
    pub fn insert_ai_content(&mut self, payload: &AiInsertPayload) -> Result<PlacementOutcome> {
        let placer = ContentPlacer::new(&self.settings.placement);
        let result = placer.place(&self.tree, payload, self.ids.as_mut())?;
        let outcome = result.outcome;
        let map = |pos: usize| {
            if pos >= outcome.position {
                pos + outcome.inserted_size
            } else {
                pos
            }
        };
        let selection = Selection::new(map(self.selection.anchor), map(self.selection.focus));
        self.dispatch(Transaction::content(result.tree, selection));
        Ok(outcome)
    }

    // =========================================================================
    // Find
    // =========================================================================

    /// Search for `query` and select the first match. Returns the match count.
    pub fn find(&mut self, query: &str) -> usize {
        self.dispatch_find(FindMeta::SetQuery(query.to_string()));
        self.find.match_count()
    }

    /// Select the next match, wrapping around
    pub fn find_next(&mut self) -> Option<Range> {
        self.dispatch_find(FindMeta::Next);
        self.find.current_match()
    }

    /// Select the previous match, wrapping around
    pub fn find_prev(&mut self) -> Option<Range> {
        self.dispatch_find(FindMeta::Prev);
        self.find.current_match()
    }

    pub fn clear_find(&mut self) {
        self.dispatch_find(FindMeta::Clear);
    }

    fn dispatch_find(&mut self, meta: FindMeta) {
        let tx = Transaction::selection_only(&self.tree, self.selection).with_find(meta);
        self.dispatch(tx);
    }

    /// Highlights for the current search
    pub fn decorations(&self) -> Vec<Decoration> {
        self.find.decorations()
    }

    // =========================================================================
    // Deep links
    // =========================================================================

    /// Put the cursor at the start of a block and ask the view to scroll to
    /// it. Returns false when no block carries `id`.
    pub fn reveal_block(&mut self, id: &BlockId) -> bool {
        let Some(path) = self.tree.find_block(id) else {
            tracing::debug!(block_id = %id, "deep link block not found");
            return false;
        };
        let index = self.tree.index();
        let textblock = index
            .paths()
            .iter()
            .filter(|p| p.indices().starts_with(path.indices()))
            .find(|p| self.tree.node(p).is_some_and(|n| n.is_textblock()));
        let position = match textblock {
            Some(p) => self.tree.content_start(p),
            None => self.tree.range_of(&path).map(|r| r.start),
        };
        let Some(position) = position else {
            return false;
        };
        let tx = Transaction::selection_only(&self.tree, Selection::collapsed(position))
            .scroll_into_view();
        self.dispatch(tx);
        true
    }
}

impl Default for EditingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EditingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingEngine")
            .field("selection", &self.selection)
            .field("size", &self.tree.size())
            .field("find", &self.find)
            .finish_non_exhaustive()
    }
}

/// Start of the first textblock's content
fn first_text_position(tree: &DocumentTree) -> Option<usize> {
    tree.index()
        .paths()
        .iter()
        .find(|p| tree.node(p).is_some_and(|n| n.is_textblock()))
        .and_then(|p| tree.content_start(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InsertContent, InsertText, PlacementStrategy};
    use chrono::{TimeZone, Utc};
    use doc_model::{Node, SequentialGenerator};

    fn engine(blocks: Vec<Node>) -> EditingEngine {
        let tree = DocumentTree::from_root(Node::doc(blocks)).unwrap();
        let ids = SequentialGenerator::new("b", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        EditingEngine::with_parts(tree, EditorSettings::default(), Box::new(ids))
    }

    fn all_ids(tree: &DocumentTree) -> Vec<String> {
        let mut ids = Vec::new();
        tree.root().descendants(&mut |n| {
            if let Some(id) = n.block_id() {
                ids.push(id.to_string());
            }
        });
        ids
    }

    #[test]
    fn test_new_engine_stabilizes_identity() {
        let engine = engine(vec![Node::paragraph("a"), Node::paragraph("b")]);
        assert_eq!(all_ids(engine.tree()), vec!["b-1", "b-2"]);
        assert_eq!(engine.selection(), Selection::collapsed(1));
    }

    #[test]
    fn test_edits_keep_ids_stable() {
        let mut engine = engine(vec![Node::paragraph("a")]);
        let before = engine.tree().root().content[0].attrs.clone();
        engine.execute(&InsertText::new(2, "bc")).unwrap();
        assert_eq!(engine.tree().text_content(), "abc");
        assert_eq!(engine.tree().root().content[0].attrs, before);
    }

    #[test]
    fn test_inserted_duplicate_gets_fresh_id() {
        let mut engine = engine(vec![Node::paragraph("a")]);
        let copy = engine.tree().root().content[0].clone();
        let end = engine.tree().size();
        engine.execute(&InsertContent::new(end, vec![copy])).unwrap();
        assert_eq!(all_ids(engine.tree()), vec!["b-1", "b-2"]);
    }

    #[test]
    fn test_find_selects_and_cycles() {
        let mut engine = engine(vec![Node::paragraph("one two one")]);
        assert_eq!(engine.find("ONE"), 2);
        assert_eq!(engine.selection(), Selection::new(1, 4));
        assert_eq!(engine.take_scroll_request(), Some(Selection::new(1, 4)));

        assert_eq!(engine.find_next(), Some(Range::new(9, 12)));
        assert_eq!(engine.selection(), Selection::new(9, 12));
        assert_eq!(engine.find_next(), Some(Range::new(1, 4)));
        assert_eq!(engine.find_prev(), Some(Range::new(9, 12)));
        assert_eq!(engine.decorations().len(), 2);

        engine.clear_find();
        assert!(engine.decorations().is_empty());
    }

    #[test]
    fn test_find_follows_edits() {
        let mut engine = engine(vec![Node::paragraph("cat")]);
        assert_eq!(engine.find("cat"), 1);
        engine.execute(&InsertText::new(4, " cat")).unwrap();
        assert_eq!(engine.find_state().match_count(), 2);
    }

    #[test]
    fn test_handle_key_routes_to_list_editor() {
        let mut engine = engine(vec![Node::bullet_list(vec![
            Node::list_item(vec![Node::paragraph("a")]),
            Node::list_item(vec![Node::paragraph("b")]),
        ])]);
        // Cursor in "b": ul(0) li(1) p(2..5) li(6) p content at 8
        engine.execute(&crate::SetSelection::new(Selection::collapsed(8))).unwrap();
        assert!(engine.handle_key(Key::Tab));
        let root = engine.tree().root();
        assert_eq!(root.content[0].child_count(), 1);
        assert!(!engine.handle_key(Key::Tab));
    }

    #[test]
    fn test_insert_ai_content_shifts_selection() {
        let mut engine = engine(vec![Node::paragraph("notes")]);
        let before = engine.selection();
        let outcome = engine
            .insert_ai_content(&AiInsertPayload::new(None, "paragraphs", &["idea"]))
            .unwrap();
        assert_eq!(outcome.strategy, PlacementStrategy::FallbackNewHeader);
        assert_eq!(
            engine.selection().anchor,
            before.anchor + outcome.inserted_size
        );
        assert_eq!(engine.tree().root().child_count(), 3);
        assert!(engine
            .insert_ai_content(&AiInsertPayload::new(None, "paragraphs", &["  "]))
            .is_err());
    }

    #[test]
    fn test_reveal_block() {
        let mut engine = engine(vec![
            Node::paragraph("intro"),
            Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("target")])])
                .with_id("list"),
        ]);
        assert!(engine.reveal_block(&BlockId::from("list")));
        // intro 0..7, ul opens at 7, li at 8, p at 9, text at 10
        assert_eq!(engine.selection(), Selection::collapsed(10));
        assert_eq!(engine.take_scroll_request(), Some(Selection::collapsed(10)));
        assert_eq!(engine.take_scroll_request(), None);
        assert!(!engine.reveal_block(&BlockId::from("nope")));
    }
}
