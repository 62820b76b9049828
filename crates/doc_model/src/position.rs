//! Position space addressing
//!
//! Every node occupies a half-open range `[start, start + size)` of a flat
//! integer space. Content of the root starts at 0; content of any other
//! non-leaf node starts one past its opening boundary. [`PositionIndex`]
//! computes all ranges in one walk and is memoized per tree, and
//! [`ResolvedPos`] answers "which ancestors contain this position".

use crate::{BlockId, DocModelError, Node, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Address of a node as child indices from the root. The root is the empty
/// path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of steps from the root
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the `index`-th child
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Path of the parent (None for the root)
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Index of this node within its parent
    pub fn last_index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Path of the sibling at `index`
    pub fn sibling(&self, index: usize) -> Option<Self> {
        self.parent().map(|p| p.child(index))
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

/// Half-open range in position space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end
    }
}

/// Position ranges of every node of a tree, plus a block id lookup table
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    ranges: HashMap<NodePath, Range>,
    blocks: HashMap<BlockId, NodePath>,
    order: Vec<NodePath>,
}

impl PositionIndex {
    /// Walk the tree once and record every node's range
    pub fn build(root: &Node) -> Self {
        let mut index = Self::default();
        index
            .ranges
            .insert(NodePath::root(), Range::new(0, root.content_size()));
        index.order.push(NodePath::root());
        index.walk_children(root, &NodePath::root(), 0);
        index
    }

    fn walk_children(&mut self, node: &Node, path: &NodePath, content_start: usize) {
        let mut pos = content_start;
        for (i, child) in node.content.iter().enumerate() {
            let child_path = path.child(i);
            let size = child.node_size();
            self.ranges.insert(child_path.clone(), Range::new(pos, pos + size));
            self.order.push(child_path.clone());
            if let Some(id) = child.block_id() {
                // First occurrence wins; duplicates are repaired by the identity pass
                self.blocks.entry(id.clone()).or_insert_with(|| child_path.clone());
            }
            if !child.content.is_empty() {
                self.walk_children(child, &child_path, pos + 1);
            }
            pos += size;
        }
    }

    /// Range of the node at `path`
    pub fn range_of(&self, path: &NodePath) -> Option<Range> {
        self.ranges.get(path).copied()
    }

    /// Path of the first block carrying `id`
    pub fn path_of_block(&self, id: &BlockId) -> Option<&NodePath> {
        self.blocks.get(id)
    }

    /// Range of the first block carrying `id`
    pub fn block_range(&self, id: &BlockId) -> Option<Range> {
        self.path_of_block(id).and_then(|p| self.range_of(p))
    }

    /// All node paths in document (pre-)order, root first
    pub fn paths(&self) -> &[NodePath] {
        &self.order
    }
}

/// One ancestor level of a resolved position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLevel {
    /// Path of the ancestor node
    pub path: NodePath,
    /// Position where the ancestor's content starts
    pub start: usize,
    /// Index of the child the position sits before or inside
    pub index: usize,
}

/// A position resolved against a tree: the chain of ancestors containing it
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    doc: &'a Node,
    pub pos: usize,
    levels: Vec<ResolvedLevel>,
}

impl<'a> ResolvedPos<'a> {
    /// Resolve `pos` against the root node `doc`
    pub fn resolve(doc: &'a Node, pos: usize) -> Result<Self> {
        let size = doc.content_size();
        if pos > size {
            return Err(DocModelError::InvalidPosition { pos, size });
        }

        let mut levels = Vec::new();
        let mut node = doc;
        let mut path = NodePath::root();
        let mut start = 0;

        loop {
            let mut child_start = start;
            let mut index = node.content.len();
            let mut descend = None;

            for (i, child) in node.content.iter().enumerate() {
                let end = child_start + child.node_size();
                if pos == child_start {
                    index = i;
                    break;
                }
                if pos < end {
                    index = i;
                    if !child.is_text() && !child.node_type().is_atom() {
                        descend = Some(child_start + 1);
                    }
                    break;
                }
                child_start = end;
            }

            levels.push(ResolvedLevel {
                path: path.clone(),
                start,
                index,
            });

            match descend {
                Some(content_start) => {
                    node = &node.content[index];
                    path = path.child(index);
                    start = content_start;
                }
                None => break,
            }
        }

        Ok(Self { doc, pos, levels })
    }

    /// Depth of the innermost ancestor (0 = the root)
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn level(&self, depth: usize) -> &ResolvedLevel {
        &self.levels[depth]
    }

    /// Path of the ancestor at `depth`
    pub fn path(&self, depth: usize) -> &NodePath {
        &self.levels[depth].path
    }

    /// The ancestor node at `depth`
    pub fn node(&self, depth: usize) -> &'a Node {
        let mut node = self.doc;
        for &i in self.levels[depth].path.indices() {
            node = &node.content[i];
        }
        node
    }

    /// The innermost ancestor
    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    /// Start of the content of the ancestor at `depth`
    pub fn start(&self, depth: usize) -> usize {
        self.levels[depth].start
    }

    /// End of the content of the ancestor at `depth`
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position right before the ancestor at `depth`; `None` for the root
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            return None;
        }
        self.start(depth).checked_sub(1)
    }

    /// Position right after the ancestor at `depth`; `None` for the root
    pub fn after(&self, depth: usize) -> Option<usize> {
        (depth > 0).then(|| self.end(depth) + 1)
    }

    /// Child index within the ancestor at `depth`
    pub fn index(&self, depth: usize) -> usize {
        self.levels[depth].index
    }

    /// Offset of the position within its innermost ancestor's content
    pub fn parent_offset(&self) -> usize {
        self.pos - self.start(self.depth())
    }

    /// Deepest depth whose ancestor satisfies `predicate`
    pub fn find_ancestor(&self, predicate: impl Fn(&Node) -> bool) -> Option<usize> {
        (0..=self.depth()).rev().find(|&d| predicate(self.node(d)))
    }
}
