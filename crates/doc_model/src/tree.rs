//! Document tree operations and storage

use crate::{
    BlockId, DocModelError, Node, NodePath, NodeType, PositionIndex, Range, ResolvedPos, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// The complete document tree.
///
/// Owns the root `doc` node and lazily memoizes its [`PositionIndex`]. Every
/// mutating method drops the memoized index so positions are always computed
/// against the current structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Node", into = "Node")]
pub struct DocumentTree {
    root: Node,
    index: OnceLock<PositionIndex>,
}

impl DocumentTree {
    /// Create a new tree holding a single empty paragraph
    pub fn new() -> Self {
        Self::from_root_unchecked(Node::doc(vec![Node::paragraph("")]))
    }

    /// Wrap a root node, which must be a `doc`
    pub fn from_root(root: Node) -> Result<Self> {
        if root.node_type() != NodeType::Doc {
            return Err(DocModelError::TreeStructureError(format!(
                "root must be doc, found {}",
                root.node_type()
            )));
        }
        Ok(Self::from_root_unchecked(root))
    }

    fn from_root_unchecked(root: Node) -> Self {
        Self {
            root,
            index: OnceLock::new(),
        }
    }

    /// Parse a tree from its JSON serialization
    pub fn from_json(json: &str) -> Result<Self> {
        let root: Node = serde_json::from_str(json)?;
        Self::from_root(root)
    }

    /// Serialize the tree to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.root)?)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Consume the tree and return the root node
    pub fn into_root(self) -> Node {
        self.root
    }

    /// Size of the document content in position space
    pub fn size(&self) -> usize {
        self.root.content_size()
    }

    /// Memoized position index of the current structure
    pub fn index(&self) -> &PositionIndex {
        self.index.get_or_init(|| PositionIndex::build(&self.root))
    }

    fn invalidate(&mut self) {
        self.index = OnceLock::new();
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Get the node at `path`
    pub fn node(&self, path: &NodePath) -> Option<&Node> {
        let mut node = &self.root;
        for &i in path.indices() {
            node = node.content.get(i)?;
        }
        Some(node)
    }

    /// Range of the node at `path`
    pub fn range_of(&self, path: &NodePath) -> Option<Range> {
        self.index().range_of(path)
    }

    /// Path of the block carrying `id`
    pub fn find_block(&self, id: &BlockId) -> Option<NodePath> {
        self.index().path_of_block(id).cloned()
    }

    /// Resolve a position to its chain of ancestors
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>> {
        ResolvedPos::resolve(&self.root, pos)
    }

    /// Position at the start of a textblock's content
    pub fn content_start(&self, path: &NodePath) -> Option<usize> {
        let range = self.range_of(path)?;
        Some(if path.is_root() { range.start } else { range.start + 1 })
    }

    /// Position at the end of a textblock's content
    pub fn content_end(&self, path: &NodePath) -> Option<usize> {
        let node = self.node(path)?;
        Some(self.content_start(path)? + node.content_size())
    }

    /// Total text content, one line per textblock
    pub fn text_content(&self) -> String {
        let mut lines = Vec::new();
        self.root.descendants(&mut |node| {
            if node.is_textblock() {
                lines.push(node.text_content());
            }
        });
        lines.join("\n")
    }

    /// Visit every node below the root with its path, in document order
    pub fn walk(&self, visit: &mut dyn FnMut(&NodePath, &Node)) {
        fn go(node: &Node, path: &NodePath, visit: &mut dyn FnMut(&NodePath, &Node)) {
            for (i, child) in node.content.iter().enumerate() {
                let child_path = path.child(i);
                visit(&child_path, child);
                go(child, &child_path, visit);
            }
        }
        go(&self.root, &NodePath::root(), visit);
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Mutable access to the node at `path`
    pub fn node_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        self.invalidate();
        let mut node = &mut self.root;
        for &i in path.indices() {
            node = node.content.get_mut(i)?;
        }
        Some(node)
    }

    /// Mutable access to the root node
    pub fn root_mut(&mut self) -> &mut Node {
        self.invalidate();
        &mut self.root
    }

    /// Check whether `nodes` may be inserted into the node at `parent` at
    /// child `index` without breaking the tree's structural rules.
    pub fn can_insert(&self, parent: &NodePath, index: usize, nodes: &[Node]) -> bool {
        let Some(parent_node) = self.node(parent) else {
            return false;
        };
        if index > parent_node.content.len() {
            return false;
        }
        let parent_type = parent_node.node_type();
        if !nodes.iter().all(|n| parent_type.allows_child(n.node_type())) {
            return false;
        }
        if parent_type.is_list_item() {
            // Items start with a textblock and hold at most one nested list
            if index == 0 && !nodes.first().map(Node::is_textblock).unwrap_or(true) {
                return false;
            }
            let lists = parent_node.content.iter().chain(nodes.iter())
                .filter(|n| n.node_type().is_list())
                .count();
            if lists > 1 {
                return false;
            }
        }
        true
    }

    /// Insert `nodes` as children of `parent` starting at `index`
    pub fn insert(&mut self, parent: &NodePath, index: usize, nodes: Vec<Node>) -> Result<()> {
        if !self.can_insert(parent, index, &nodes) {
            return Err(DocModelError::TreeStructureError(format!(
                "cannot insert {} node(s) into {:?} at {}",
                nodes.len(),
                parent.indices(),
                index
            )));
        }
        let parent_node = self
            .node_mut(parent)
            .ok_or_else(|| DocModelError::PathNotFound(parent.indices().to_vec()))?;
        parent_node.content.splice(index..index, nodes);
        Ok(())
    }

    /// Insert block nodes at a position that sits between two children
    pub fn insert_at(&mut self, pos: usize, nodes: Vec<Node>) -> Result<NodePath> {
        let (parent, index) = {
            let rp = self.resolve(pos)?;
            let depth = rp.depth();
            if rp.parent().is_textblock() || rp.parent_offset() != self.offset_of_child(&rp, depth) {
                return Err(DocModelError::InvalidPosition {
                    pos,
                    size: self.size(),
                });
            }
            (rp.path(depth).clone(), rp.index(depth))
        };
        self.insert(&parent, index, nodes)?;
        Ok(parent.child(index))
    }

    fn offset_of_child(&self, rp: &ResolvedPos<'_>, depth: usize) -> usize {
        rp.node(depth).content[..rp.index(depth)]
            .iter()
            .map(Node::node_size)
            .sum()
    }

    /// Remove and return the node at `path`
    pub fn remove(&mut self, path: &NodePath) -> Result<Node> {
        let (parent, index) = match (path.parent(), path.last_index()) {
            (Some(parent), Some(index)) => (parent, index),
            _ => {
                return Err(DocModelError::TreeStructureError(
                    "cannot remove the root".to_string(),
                ))
            }
        };
        let parent_node = self
            .node_mut(&parent)
            .ok_or_else(|| DocModelError::PathNotFound(parent.indices().to_vec()))?;
        if index >= parent_node.content.len() {
            return Err(DocModelError::PathNotFound(path.indices().to_vec()));
        }
        Ok(parent_node.content.remove(index))
    }

    /// Replace the node at `path`, returning the old one
    pub fn replace(&mut self, path: &NodePath, node: Node) -> Result<Node> {
        if path.is_root() && node.node_type() != NodeType::Doc {
            return Err(DocModelError::TreeStructureError(
                "root must be doc".to_string(),
            ));
        }
        let slot = self
            .node_mut(path)
            .ok_or_else(|| DocModelError::PathNotFound(path.indices().to_vec()))?;
        Ok(std::mem::replace(slot, node))
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for DocumentTree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl TryFrom<Node> for DocumentTree {
    type Error = DocModelError;

    fn try_from(root: Node) -> Result<Self> {
        Self::from_root(root)
    }
}

impl From<DocumentTree> for Node {
    fn from(tree: DocumentTree) -> Node {
        tree.root
    }
}
