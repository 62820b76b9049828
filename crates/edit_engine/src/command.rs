//! Transactions and the command system for document editing

use crate::{EditError, FindMeta, Result};
use doc_model::{DocumentTree, Node, NodeKind, NodePath, Selection};
use serde::{Deserialize, Serialize};

/// Metadata carried alongside a transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionMeta {
    /// Set on transactions produced by the identity pass so it never
    /// reprocesses its own output
    pub identity_pass: bool,
    /// Find state change to feed into the find reducer
    pub find: Option<FindMeta>,
    /// Ask the view to scroll the selection into view
    pub scroll_into_view: bool,
}

/// Result of applying a command: the next document and selection
#[derive(Debug, Clone)]
pub struct Transaction {
    /// The document tree after the change
    pub tree: DocumentTree,
    /// The selection after the change
    pub selection: Selection,
    /// Whether the document content differs from the input
    pub doc_changed: bool,
    pub meta: TransactionMeta,
}

impl Transaction {
    /// A transaction that changes the document
    pub fn content(tree: DocumentTree, selection: Selection) -> Self {
        Self {
            tree,
            selection,
            doc_changed: true,
            meta: TransactionMeta::default(),
        }
    }

    /// A transaction that only moves the selection
    pub fn selection_only(tree: &DocumentTree, selection: Selection) -> Self {
        Self {
            tree: tree.clone(),
            selection,
            doc_changed: false,
            meta: TransactionMeta::default(),
        }
    }

    /// Builder: request scrolling the selection into view
    pub fn scroll_into_view(mut self) -> Self {
        self.meta.scroll_into_view = true;
        self
    }

    /// Builder: attach find metadata
    pub fn with_find(mut self, meta: FindMeta) -> Self {
        self.meta.find = Some(meta);
        self
    }
}

/// Trait for all editing commands
pub trait Command: std::fmt::Debug {
    /// Apply this command to a document
    fn apply(&self, tree: &DocumentTree, selection: &Selection) -> Result<Transaction>;

    /// Get a display name for this command
    fn display_name(&self) -> &str;
}

// ============================================================================
// Helper functions for editing inline content
// ============================================================================

/// Resolve `pos` to the path of the textblock containing it and the offset
/// within that textblock's content.
fn textblock_at(tree: &DocumentTree, pos: usize) -> Result<(NodePath, usize)> {
    let rp = tree.resolve(pos)?;
    if !rp.parent().is_textblock() {
        return Err(EditError::InvalidCommand(format!(
            "position {} is not inside a textblock",
            pos
        )));
    }
    Ok((rp.path(rp.depth()).clone(), rp.parent_offset()))
}

/// Insert `text` at character `offset` of a textblock's inline content.
///
/// Text joins the run ending at the offset when there is one so it picks up
/// that run's marks; otherwise a new unmarked run is created.
fn insert_inline_text(content: &mut Vec<Node>, offset: usize, text: &str) {
    enum Spot {
        InRun(usize, usize),
        Before(usize),
    }

    let mut spot = None;
    let mut start = 0;
    for (i, child) in content.iter().enumerate() {
        let size = child.node_size();
        if child.is_text() {
            if offset >= start && offset <= start + size {
                spot = Some(Spot::InRun(i, offset - start));
                break;
            }
        } else if offset <= start {
            spot = Some(Spot::Before(i));
            break;
        }
        start += size;
    }

    match spot {
        Some(Spot::InRun(i, at)) => {
            if let NodeKind::Text(run) = &mut content[i].kind {
                let byte = run.byte_offset(at);
                run.text.insert_str(byte, text);
            }
        }
        Some(Spot::Before(i)) => content.insert(i, Node::text(text)),
        None => content.push(Node::text(text)),
    }
}

/// Delete inline content in `[from, to)` (offsets within the textblock)
fn delete_inline(content: &mut Vec<Node>, from: usize, to: usize) {
    let mut start = 0;
    let mut kept = Vec::with_capacity(content.len());
    for mut child in content.drain(..) {
        let size = child.node_size();
        let end = start + size;
        let keep = match &mut child.kind {
            NodeKind::Text(run) => {
                let text: String = run
                    .text
                    .chars()
                    .enumerate()
                    .filter(|(i, _)| {
                        let p = start + i;
                        p < from || p >= to
                    })
                    .map(|(_, c)| c)
                    .collect();
                run.text = text;
                !run.text.is_empty()
            }
            _ => end <= from || start >= to,
        };
        if keep {
            kept.push(child);
        }
        start = end;
    }
    *content = kept;
}

/// Merge adjacent runs with identical marks
fn normalize_runs(content: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(content.len());
    for child in content.drain(..) {
        if let (Some(prev), NodeKind::Text(run)) = (merged.last_mut(), &child.kind) {
            if let NodeKind::Text(prev_run) = &mut prev.kind {
                if prev_run.marks == run.marks {
                    prev_run.text.push_str(&run.text);
                    continue;
                }
            }
        }
        merged.push(child);
    }
    *content = merged;
}

// ============================================================================
// Basic commands
// ============================================================================

/// Insert text at a position inside a textblock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertText {
    pub position: usize,
    pub text: String,
}

impl InsertText {
    pub fn new(position: usize, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }
}

impl Command for InsertText {
    fn apply(&self, tree: &DocumentTree, selection: &Selection) -> Result<Transaction> {
        let (path, offset) = textblock_at(tree, self.position)?;
        let inserted = self.text.chars().count();
        let mut new_tree = tree.clone();
        let block = new_tree
            .node_mut(&path)
            .ok_or_else(|| EditError::InvalidCommand("textblock vanished".to_string()))?;
        insert_inline_text(&mut block.content, offset, &self.text);

        let map = |p: usize| if p >= self.position { p + inserted } else { p };
        let new_selection = if selection.is_collapsed() && selection.focus == self.position {
            Selection::collapsed(self.position + inserted)
        } else {
            Selection::new(map(selection.anchor), map(selection.focus))
        };
        Ok(Transaction::content(new_tree, new_selection))
    }

    fn display_name(&self) -> &str {
        "Insert Text"
    }
}

/// Delete a range of inline content within a single textblock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteText {
    pub from: usize,
    pub to: usize,
}

impl DeleteText {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

impl Command for DeleteText {
    fn apply(&self, tree: &DocumentTree, _selection: &Selection) -> Result<Transaction> {
        if self.from > self.to {
            return Err(EditError::InvalidCommand(format!(
                "inverted range {}..{}",
                self.from, self.to
            )));
        }
        let (path, from_offset) = textblock_at(tree, self.from)?;
        let (end_path, to_offset) = textblock_at(tree, self.to)?;
        if path != end_path {
            return Err(EditError::InvalidCommand(
                "delete range spans several textblocks".to_string(),
            ));
        }

        let mut new_tree = tree.clone();
        let block = new_tree
            .node_mut(&path)
            .ok_or_else(|| EditError::InvalidCommand("textblock vanished".to_string()))?;
        delete_inline(&mut block.content, from_offset, to_offset);
        normalize_runs(&mut block.content);

        Ok(Transaction::content(new_tree, Selection::collapsed(self.from)))
    }

    fn display_name(&self) -> &str {
        "Delete Text"
    }
}

/// Insert block nodes at a position between two blocks
#[derive(Debug, Clone)]
pub struct InsertContent {
    pub position: usize,
    pub nodes: Vec<Node>,
}

impl InsertContent {
    pub fn new(position: usize, nodes: Vec<Node>) -> Self {
        Self { position, nodes }
    }
}

impl Command for InsertContent {
    fn apply(&self, tree: &DocumentTree, selection: &Selection) -> Result<Transaction> {
        let mut new_tree = tree.clone();
        new_tree.insert_at(self.position, self.nodes.clone())?;
        let inserted: usize = self.nodes.iter().map(Node::node_size).sum();
        let map = |p: usize| if p >= self.position { p + inserted } else { p };
        Ok(Transaction::content(
            new_tree,
            Selection::new(map(selection.anchor), map(selection.focus)),
        ))
    }

    fn display_name(&self) -> &str {
        "Insert Content"
    }
}

/// Move the selection without touching content
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetSelection {
    pub selection: Selection,
}

impl SetSelection {
    pub fn new(selection: Selection) -> Self {
        Self { selection }
    }
}

impl Command for SetSelection {
    fn apply(&self, tree: &DocumentTree, _selection: &Selection) -> Result<Transaction> {
        let size = tree.size();
        if self.selection.end() > size {
            return Err(EditError::DocModel(doc_model::DocModelError::InvalidPosition {
                pos: self.selection.end(),
                size,
            }));
        }
        Ok(Transaction::selection_only(tree, self.selection))
    }

    fn display_name(&self) -> &str {
        "Set Selection"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::Mark;

    fn tree_with(content: Vec<Node>) -> DocumentTree {
        DocumentTree::from_root(Node::doc(vec![Node::paragraph_with(content)])).unwrap()
    }

    #[test]
    fn test_insert_text_joins_preceding_run() {
        let tree = tree_with(vec![
            Node::text_with_marks("bold", vec![Mark::Bold]),
            Node::text(" plain"),
        ]);
        // Position 5 is right after "bold"
        let tx = InsertText::new(5, "er")
            .apply(&tree, &Selection::collapsed(5))
            .unwrap();
        let para = &tx.tree.root().content[0];
        assert_eq!(para.content[0].as_text().unwrap().text, "bolder");
        assert_eq!(tx.selection, Selection::collapsed(7));
        assert!(tx.doc_changed);
    }

    #[test]
    fn test_insert_text_into_empty_paragraph() {
        let tree = tree_with(vec![]);
        let tx = InsertText::new(1, "hi").apply(&tree, &Selection::collapsed(1)).unwrap();
        assert_eq!(tx.tree.text_content(), "hi");
    }

    #[test]
    fn test_insert_text_outside_textblock_fails() {
        let tree = tree_with(vec![Node::text("x")]);
        assert!(InsertText::new(0, "y").apply(&tree, &Selection::collapsed(0)).is_err());
    }

    #[test]
    fn test_delete_text_across_runs() {
        let tree = tree_with(vec![
            Node::text_with_marks("ab", vec![Mark::Italic]),
            Node::text("cd"),
            Node::text_with_marks("ef", vec![Mark::Italic]),
        ]);
        // Delete "bcde" (positions 2..6)
        let tx = DeleteText::new(2, 6).apply(&tree, &Selection::collapsed(6)).unwrap();
        let para = &tx.tree.root().content[0];
        assert_eq!(para.text_content(), "af");
        // Remaining italic runs merge back together
        assert_eq!(para.content.len(), 1);
        assert_eq!(tx.selection, Selection::collapsed(2));
    }

    #[test]
    fn test_set_selection_is_not_a_content_change() {
        let tree = tree_with(vec![Node::text("abc")]);
        let tx = SetSelection::new(Selection::new(1, 3))
            .apply(&tree, &Selection::collapsed(1))
            .unwrap();
        assert!(!tx.doc_changed);
        assert!(SetSelection::new(Selection::collapsed(99))
            .apply(&tree, &Selection::collapsed(1))
            .is_err());
    }

    #[test]
    fn test_insert_content_shifts_selection() {
        let tree = tree_with(vec![Node::text("abc")]);
        let tx = InsertContent::new(0, vec![Node::paragraph("new")])
            .apply(&tree, &Selection::collapsed(2))
            .unwrap();
        assert_eq!(tx.selection, Selection::collapsed(7));
        assert_eq!(tx.tree.root().child_count(), 2);
    }
}
