//! Block identity stabilization
//!
//! After every content-changing transaction the tree is scanned in document
//! order. A tracked block whose id is missing, or whose id was already seen
//! earlier in the same scan, receives a fresh id and a new `created_at`. A
//! block with a unique id but no `created_at` only gets the timestamp. All
//! fixes go out as one extra transaction tagged `identity_pass`, which the
//! pass itself ignores.

use crate::Transaction;
use doc_model::{BlockId, DocumentTree, IdGenerator, Node, NodeType};
use std::collections::HashSet;

/// Assigns and repairs block identities
#[derive(Debug, Clone)]
pub struct IdentityAssigner {
    tracked: HashSet<NodeType>,
}

impl IdentityAssigner {
    /// Track every block-level node type
    pub fn new() -> Self {
        Self::with_tracked(NodeType::BLOCKS)
    }

    /// Track only the given node types
    pub fn with_tracked(types: impl IntoIterator<Item = NodeType>) -> Self {
        Self {
            tracked: types.into_iter().filter(NodeType::is_block).collect(),
        }
    }

    pub fn is_tracked(&self, node_type: NodeType) -> bool {
        self.tracked.contains(&node_type)
    }

    /// Check whether the tree has any identity defect
    pub fn needs_fix(&self, tree: &DocumentTree) -> bool {
        let mut seen = HashSet::new();
        let mut defect = false;
        tree.root().descendants(&mut |node| {
            if defect || !self.is_tracked(node.node_type()) {
                return;
            }
            match &node.attrs.id {
                Some(id) if seen.insert(id.clone()) => {
                    defect = node.attrs.created_at.is_none();
                }
                _ => defect = true,
            }
        });
        defect
    }

    /// Repair identities in place and return the number of blocks touched
    pub fn stabilize(&self, tree: &mut DocumentTree, ids: &mut dyn IdGenerator) -> usize {
        if !self.needs_fix(tree) {
            return 0;
        }

        let now = ids.now();
        let mut seen: HashSet<BlockId> = HashSet::new();
        let mut fixes = 0;
        tree.root_mut().descendants_mut(&mut |node: &mut Node| {
            if !self.is_tracked(node.node_type()) {
                return;
            }
            match node.attrs.id.clone() {
                Some(id) if !seen.contains(&id) => {
                    seen.insert(id);
                    if node.attrs.created_at.is_none() {
                        node.attrs.created_at = Some(now);
                        fixes += 1;
                    }
                }
                _ => {
                    let mut fresh = ids.next_id();
                    while seen.contains(&fresh) {
                        fresh = ids.next_id();
                    }
                    seen.insert(fresh.clone());
                    node.attrs.id = Some(fresh);
                    // New identity means a new block
                    node.attrs.created_at = Some(now);
                    fixes += 1;
                }
            }
        });
        fixes
    }

    /// Produce the follow-up transaction for a batch of applied transactions.
    ///
    /// Returns `None` when nothing in the batch changed content (or only the
    /// pass's own transactions did), or when the resulting tree is already
    /// stable.
    pub fn append_transaction(
        &self,
        transactions: &[&Transaction],
        tree: &DocumentTree,
        ids: &mut dyn IdGenerator,
    ) -> Option<Transaction> {
        let relevant = transactions
            .iter()
            .any(|tr| tr.doc_changed && !tr.meta.identity_pass);
        if !relevant {
            return None;
        }

        let mut fixed = tree.clone();
        let fixes = self.stabilize(&mut fixed, ids);
        if fixes == 0 {
            return None;
        }
        tracing::debug!(fixes, "identity pass repaired blocks");

        // Attribute changes never move positions, so the selection carries over
        let selection = transactions
            .last()
            .map(|tr| tr.selection)
            .unwrap_or_default();
        let mut tx = Transaction::content(fixed, selection);
        tx.meta.identity_pass = true;
        Some(tx)
    }
}

impl Default for IdentityAssigner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use doc_model::{BlockAttrs, NodePath, Selection, SequentialGenerator};

    fn generator() -> SequentialGenerator {
        SequentialGenerator::new("id", Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn attrs(id: &str, minute: u32) -> BlockAttrs {
        BlockAttrs::with_identity(
            BlockId::from(id),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, minute, 0).unwrap(),
        )
    }

    #[test]
    fn test_assigns_missing_ids() {
        let mut tree = DocumentTree::from_root(Node::doc(vec![
            Node::paragraph("a"),
            Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("b")])]),
        ]))
        .unwrap();
        let mut ids = generator();
        let fixes = IdentityAssigner::new().stabilize(&mut tree, &mut ids);
        // paragraph, list, item, inner paragraph
        assert_eq!(fixes, 4);
        assert!(!IdentityAssigner::new().needs_fix(&tree));
        assert_eq!(tree.root().content[0].block_id().unwrap().as_str(), "id-1");
    }

    #[test]
    fn test_duplicate_id_resets_later_block() {
        let mut tree = DocumentTree::from_root(Node::doc(vec![
            Node::paragraph("first").with_attrs(attrs("dup", 1)),
            Node::paragraph("second").with_attrs(attrs("dup", 2)),
        ]))
        .unwrap();
        let mut ids = generator();
        let now = ids.now();
        let fixes = IdentityAssigner::new().stabilize(&mut tree, &mut ids);
        assert_eq!(fixes, 1);

        let first = &tree.root().content[0];
        let second = &tree.root().content[1];
        assert_eq!(first.attrs, attrs("dup", 1));
        assert_eq!(second.block_id().unwrap().as_str(), "id-1");
        assert_eq!(second.attrs.created_at, Some(now));
    }

    #[test]
    fn test_missing_timestamp_keeps_id() {
        let mut tree = DocumentTree::from_root(Node::doc(vec![Node::paragraph("x").with_id("keep")]))
            .unwrap();
        let mut ids = generator();
        IdentityAssigner::new().stabilize(&mut tree, &mut ids);
        let para = &tree.root().content[0];
        assert_eq!(para.block_id().unwrap().as_str(), "keep");
        assert!(para.attrs.created_at.is_some());
        assert_eq!(ids.issued(), 0);
    }

    #[test]
    fn test_fresh_id_skips_ids_already_seen() {
        // "id-1" is taken earlier in the scan, so the duplicate must not get it
        let mut tree = DocumentTree::from_root(Node::doc(vec![
            Node::paragraph("a").with_attrs(attrs("id-1", 0)),
            Node::paragraph("b"),
        ]))
        .unwrap();
        let mut ids = generator();
        IdentityAssigner::new().stabilize(&mut tree, &mut ids);
        assert_eq!(tree.root().content[1].block_id().unwrap().as_str(), "id-2");
    }

    #[test]
    fn test_untracked_types_are_left_alone() {
        let mut tree = DocumentTree::from_root(Node::doc(vec![Node::bullet_list(vec![
            Node::list_item(vec![Node::paragraph("a")]),
        ])]))
        .unwrap();
        let assigner = IdentityAssigner::with_tracked([NodeType::Paragraph]);
        assigner.stabilize(&mut tree, &mut generator());
        assert!(tree.root().content[0].attrs.id.is_none());
        let para = tree.node(&NodePath::from_indices(vec![0, 0, 0])).unwrap();
        assert!(para.attrs.id.is_some());
    }

    #[test]
    fn test_append_transaction_ignores_own_output() {
        let tree = DocumentTree::from_root(Node::doc(vec![Node::paragraph("a")])).unwrap();
        let assigner = IdentityAssigner::new();
        let mut ids = generator();

        let selection_only = Transaction::selection_only(&tree, Selection::collapsed(1));
        assert!(assigner
            .append_transaction(&[&selection_only], &tree, &mut ids)
            .is_none());

        let edit = Transaction::content(tree.clone(), Selection::collapsed(1));
        let fix = assigner
            .append_transaction(&[&edit], &tree, &mut ids)
            .expect("unstable tree needs a fix");
        assert!(fix.meta.identity_pass);
        assert_eq!(fix.selection, Selection::collapsed(1));

        // Feeding the fix back in produces nothing
        assert!(assigner
            .append_transaction(&[&fix], &fix.tree, &mut ids)
            .is_none());
    }
}
