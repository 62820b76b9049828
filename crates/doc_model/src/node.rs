//! Core node types of the document tree

use crate::{BlockAttrs, BlockId, Mark, TextRun};
use serde::{Deserialize, Serialize};

/// Enumeration of all node types in the document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    TaskList,
    ListItem,
    TaskItem,
    Table,
    TableRow,
    TableCell,
    TableHeader,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    Image,
    Text,
    HardBreak,
}

impl NodeType {
    /// Every block-level type, in declaration order
    pub const BLOCKS: [NodeType; 15] = [
        NodeType::Paragraph,
        NodeType::Heading,
        NodeType::BulletList,
        NodeType::OrderedList,
        NodeType::TaskList,
        NodeType::ListItem,
        NodeType::TaskItem,
        NodeType::Table,
        NodeType::TableRow,
        NodeType::TableCell,
        NodeType::TableHeader,
        NodeType::Blockquote,
        NodeType::CodeBlock,
        NodeType::HorizontalRule,
        NodeType::Image,
    ];

    /// The serialized `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::Doc => "doc",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::BulletList => "bulletList",
            NodeType::OrderedList => "orderedList",
            NodeType::TaskList => "taskList",
            NodeType::ListItem => "listItem",
            NodeType::TaskItem => "taskItem",
            NodeType::Table => "table",
            NodeType::TableRow => "tableRow",
            NodeType::TableCell => "tableCell",
            NodeType::TableHeader => "tableHeader",
            NodeType::Blockquote => "blockquote",
            NodeType::CodeBlock => "codeBlock",
            NodeType::HorizontalRule => "horizontalRule",
            NodeType::Image => "image",
            NodeType::Text => "text",
            NodeType::HardBreak => "hardBreak",
        }
    }

    /// Parse a serialized `type` tag
    pub fn from_name(name: &str) -> Option<Self> {
        let node_type = match name {
            "doc" => NodeType::Doc,
            "paragraph" => NodeType::Paragraph,
            "heading" => NodeType::Heading,
            "bulletList" => NodeType::BulletList,
            "orderedList" => NodeType::OrderedList,
            "taskList" => NodeType::TaskList,
            "listItem" => NodeType::ListItem,
            "taskItem" => NodeType::TaskItem,
            "table" => NodeType::Table,
            "tableRow" => NodeType::TableRow,
            "tableCell" => NodeType::TableCell,
            "tableHeader" => NodeType::TableHeader,
            "blockquote" => NodeType::Blockquote,
            "codeBlock" => NodeType::CodeBlock,
            "horizontalRule" => NodeType::HorizontalRule,
            "image" => NodeType::Image,
            "text" => NodeType::Text,
            "hardBreak" => NodeType::HardBreak,
            _ => return None,
        };
        Some(node_type)
    }

    /// Block-level node (carries identity attrs)
    pub fn is_block(&self) -> bool {
        !matches!(self, NodeType::Doc | NodeType::Text | NodeType::HardBreak)
    }

    /// Block whose content is inline (text runs and hard breaks)
    pub fn is_textblock(&self) -> bool {
        matches!(
            self,
            NodeType::Paragraph | NodeType::Heading | NodeType::CodeBlock
        )
    }

    /// Leaf node without content that occupies a single position
    pub fn is_atom(&self) -> bool {
        matches!(
            self,
            NodeType::HorizontalRule | NodeType::Image | NodeType::HardBreak
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            NodeType::BulletList | NodeType::OrderedList | NodeType::TaskList
        )
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, NodeType::ListItem | NodeType::TaskItem)
    }

    /// Table, row and cell types. These are never treated as list merge
    /// targets nor as insertion anchors.
    pub fn is_table_structural(&self) -> bool {
        matches!(
            self,
            NodeType::Table | NodeType::TableRow | NodeType::TableCell | NodeType::TableHeader
        )
    }

    /// Node types whose content is a sequence of blocks
    pub fn holds_blocks(&self) -> bool {
        matches!(
            self,
            NodeType::Doc
                | NodeType::ListItem
                | NodeType::TaskItem
                | NodeType::Blockquote
                | NodeType::TableCell
                | NodeType::TableHeader
        )
    }

    /// Item type a list of this type contains
    pub fn item_type(&self) -> Option<NodeType> {
        match self {
            NodeType::BulletList | NodeType::OrderedList => Some(NodeType::ListItem),
            NodeType::TaskList => Some(NodeType::TaskItem),
            _ => None,
        }
    }

    /// Check whether `child` may appear directly inside a node of this type
    pub fn allows_child(&self, child: NodeType) -> bool {
        match self {
            NodeType::Doc | NodeType::Blockquote | NodeType::TableCell | NodeType::TableHeader => {
                child.is_block()
                    && !child.is_list_item()
                    && !matches!(
                        child,
                        NodeType::TableRow | NodeType::TableCell | NodeType::TableHeader
                    )
            }
            NodeType::ListItem | NodeType::TaskItem => {
                child.is_block() && !child.is_list_item() && !child.is_table_structural()
            }
            NodeType::BulletList | NodeType::OrderedList | NodeType::TaskList => {
                Some(child) == self.item_type()
            }
            NodeType::Table => child == NodeType::TableRow,
            NodeType::TableRow => matches!(child, NodeType::TableCell | NodeType::TableHeader),
            NodeType::Paragraph | NodeType::Heading | NodeType::CodeBlock => {
                matches!(child, NodeType::Text | NodeType::HardBreak)
            }
            NodeType::HorizontalRule | NodeType::Image | NodeType::Text | NodeType::HardBreak => false,
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Cell attributes shared by `tableCell` and `tableHeader`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAttrs {
    pub colspan: u32,
    pub rowspan: u32,
}

impl Default for CellAttrs {
    fn default() -> Self {
        Self {
            colspan: 1,
            rowspan: 1,
        }
    }
}

/// Image attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageAttrs {
    pub src: String,
    pub alt: Option<String>,
    pub title: Option<String>,
}

/// Closed set of node kinds with their type-specific attributes
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading { level: u8 },
    BulletList,
    OrderedList { start: u32 },
    TaskList,
    ListItem,
    TaskItem { checked: bool },
    Table,
    TableRow,
    TableCell(CellAttrs),
    TableHeader(CellAttrs),
    Blockquote,
    CodeBlock { language: Option<String> },
    HorizontalRule,
    Image(ImageAttrs),
    Text(TextRun),
    HardBreak,
}

impl NodeKind {
    /// Get the type tag of this kind
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Doc => NodeType::Doc,
            NodeKind::Paragraph => NodeType::Paragraph,
            NodeKind::Heading { .. } => NodeType::Heading,
            NodeKind::BulletList => NodeType::BulletList,
            NodeKind::OrderedList { .. } => NodeType::OrderedList,
            NodeKind::TaskList => NodeType::TaskList,
            NodeKind::ListItem => NodeType::ListItem,
            NodeKind::TaskItem { .. } => NodeType::TaskItem,
            NodeKind::Table => NodeType::Table,
            NodeKind::TableRow => NodeType::TableRow,
            NodeKind::TableCell(_) => NodeType::TableCell,
            NodeKind::TableHeader(_) => NodeType::TableHeader,
            NodeKind::Blockquote => NodeType::Blockquote,
            NodeKind::CodeBlock { .. } => NodeType::CodeBlock,
            NodeKind::HorizontalRule => NodeType::HorizontalRule,
            NodeKind::Image(_) => NodeType::Image,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::HardBreak => NodeType::HardBreak,
        }
    }

    /// Default kind for a type (empty attributes)
    pub fn empty(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Doc => NodeKind::Doc,
            NodeType::Paragraph => NodeKind::Paragraph,
            NodeType::Heading => NodeKind::Heading { level: 1 },
            NodeType::BulletList => NodeKind::BulletList,
            NodeType::OrderedList => NodeKind::OrderedList { start: 1 },
            NodeType::TaskList => NodeKind::TaskList,
            NodeType::ListItem => NodeKind::ListItem,
            NodeType::TaskItem => NodeKind::TaskItem { checked: false },
            NodeType::Table => NodeKind::Table,
            NodeType::TableRow => NodeKind::TableRow,
            NodeType::TableCell => NodeKind::TableCell(CellAttrs::default()),
            NodeType::TableHeader => NodeKind::TableHeader(CellAttrs::default()),
            NodeType::Blockquote => NodeKind::Blockquote,
            NodeType::CodeBlock => NodeKind::CodeBlock { language: None },
            NodeType::HorizontalRule => NodeKind::HorizontalRule,
            NodeType::Image => NodeKind::Image(ImageAttrs::default()),
            NodeType::Text => NodeKind::Text(TextRun::default()),
            NodeType::HardBreak => NodeKind::HardBreak,
        }
    }
}

/// A node of the document tree.
///
/// Block nodes own their children directly; text runs are leaves carrying
/// their string and marks inside [`NodeKind::Text`]. `attrs` is only
/// meaningful for block nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "crate::json::RawNode", into = "crate::json::RawNode")]
pub struct Node {
    pub kind: NodeKind,
    pub attrs: BlockAttrs,
    pub content: Vec<Node>,
}

impl Node {
    /// Create a node of the given kind with children
    pub fn new(kind: NodeKind, content: Vec<Node>) -> Self {
        Self {
            kind,
            attrs: BlockAttrs::default(),
            content,
        }
    }

    /// The document root
    pub fn doc(content: Vec<Node>) -> Self {
        Self::new(NodeKind::Doc, content)
    }

    /// A plain text run
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(TextRun::new(text)), Vec::new())
    }

    /// A text run carrying marks
    pub fn text_with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self::new(NodeKind::Text(TextRun::with_marks(text, marks)), Vec::new())
    }

    pub fn hard_break() -> Self {
        Self::new(NodeKind::HardBreak, Vec::new())
    }

    /// A paragraph holding a single plain run (or nothing when `text` is empty)
    pub fn paragraph(text: &str) -> Self {
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        Self::new(NodeKind::Paragraph, content)
    }

    pub fn paragraph_with(content: Vec<Node>) -> Self {
        Self::new(NodeKind::Paragraph, content)
    }

    pub fn heading(level: u8, text: &str) -> Self {
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        Self::new(NodeKind::Heading { level }, content)
    }

    pub fn bullet_list(items: Vec<Node>) -> Self {
        Self::new(NodeKind::BulletList, items)
    }

    pub fn ordered_list(items: Vec<Node>) -> Self {
        Self::new(NodeKind::OrderedList { start: 1 }, items)
    }

    pub fn task_list(items: Vec<Node>) -> Self {
        Self::new(NodeKind::TaskList, items)
    }

    pub fn list_item(content: Vec<Node>) -> Self {
        Self::new(NodeKind::ListItem, content)
    }

    pub fn task_item(checked: bool, content: Vec<Node>) -> Self {
        Self::new(NodeKind::TaskItem { checked }, content)
    }

    /// An empty node of the given type
    pub fn empty(node_type: NodeType) -> Self {
        Self::new(NodeKind::empty(node_type), Vec::new())
    }

    /// Builder: attach a block id
    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.attrs.id = Some(id.into());
        self
    }

    /// Builder: replace all block attributes
    pub fn with_attrs(mut self, attrs: BlockAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    /// Get the type of this node
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// The block id, if this is a block carrying one
    pub fn block_id(&self) -> Option<&BlockId> {
        if self.node_type().is_block() {
            self.attrs.id.as_ref()
        } else {
            None
        }
    }

    /// Text run payload, for text nodes
    pub fn as_text(&self) -> Option<&TextRun> {
        match &self.kind {
            NodeKind::Text(run) => Some(run),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    pub fn is_textblock(&self) -> bool {
        self.node_type().is_textblock()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    /// Size of the node in position space.
    ///
    /// Text runs count their characters, atoms occupy one position and every
    /// other node adds an opening and a closing boundary around its content.
    pub fn node_size(&self) -> usize {
        match &self.kind {
            NodeKind::Text(run) => run.len(),
            _ if self.node_type().is_atom() => 1,
            _ => self.content_size() + 2,
        }
    }

    /// Sum of the sizes of all children
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// Concatenated text of all descendant runs
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let NodeKind::Text(run) = &self.kind {
            out.push_str(&run.text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }

    /// Textblock without any non-whitespace character
    pub fn is_blank_textblock(&self) -> bool {
        self.is_textblock() && self.text_content().trim().is_empty()
    }

    /// Textblock with no content at all
    pub fn is_empty_textblock(&self) -> bool {
        self.is_textblock() && self.content_size() == 0
    }

    /// Check that the node has text and every non-empty run has a mark
    /// matching `predicate`
    pub fn all_text_marked(&self, predicate: impl Fn(&Mark) -> bool + Copy) -> bool {
        let mut seen_text = false;
        let all = self.all_runs(&mut |run: &TextRun| {
            if run.text.is_empty() {
                return true;
            }
            seen_text = true;
            run.marks.iter().any(predicate)
        });
        all && seen_text
    }

    fn all_runs(&self, check: &mut dyn FnMut(&TextRun) -> bool) -> bool {
        if let NodeKind::Text(run) = &self.kind {
            return check(run);
        }
        self.content.iter().all(|child| child.all_runs(check))
    }

    /// Index of the first child list of the given type
    pub fn find_child_of_type(&self, node_type: NodeType) -> Option<usize> {
        self.content.iter().position(|c| c.node_type() == node_type)
    }

    /// Number of textblock children
    pub fn textblock_child_count(&self) -> usize {
        self.content.iter().filter(|c| c.is_textblock()).count()
    }

    /// Visit this node and all descendants in document order
    pub fn descendants(&self, visit: &mut dyn FnMut(&Node)) {
        visit(self);
        for child in &self.content {
            child.descendants(visit);
        }
    }

    /// Mutable pre-order walk
    pub fn descendants_mut(&mut self, visit: &mut dyn FnMut(&mut Node)) {
        visit(self);
        for child in &mut self.content {
            child.descendants_mut(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_sizes() {
        let para = Node::paragraph("hello");
        assert_eq!(para.node_size(), 7);
        assert_eq!(Node::paragraph("").node_size(), 2);
        assert_eq!(Node::empty(NodeType::HorizontalRule).node_size(), 1);

        let list = Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("ab")])]);
        // list(item(para(ab)))
        assert_eq!(list.node_size(), 2 + 2 + 2 + 2);
    }

    #[test]
    fn test_type_names_round_trip() {
        for node_type in NodeType::BLOCKS {
            assert_eq!(NodeType::from_name(node_type.name()), Some(node_type));
        }
        assert_eq!(NodeType::from_name("mystery"), None);
    }

    #[test]
    fn test_allows_child() {
        assert!(NodeType::BulletList.allows_child(NodeType::ListItem));
        assert!(!NodeType::BulletList.allows_child(NodeType::TaskItem));
        assert!(NodeType::ListItem.allows_child(NodeType::BulletList));
        assert!(!NodeType::Table.allows_child(NodeType::Paragraph));
        assert!(NodeType::TableCell.allows_child(NodeType::Paragraph));
        assert!(!NodeType::Doc.allows_child(NodeType::ListItem));
    }

    #[test]
    fn test_all_text_marked() {
        let bold = Node::paragraph_with(vec![Node::text_with_marks("Title", vec![Mark::Bold])]);
        assert!(bold.all_text_marked(|m| matches!(m, Mark::Bold)));

        let mixed = Node::paragraph_with(vec![
            Node::text_with_marks("Ti", vec![Mark::Bold]),
            Node::text("tle"),
        ]);
        assert!(!mixed.all_text_marked(|m| matches!(m, Mark::Bold)));
        assert!(!Node::paragraph("").all_text_marked(|m| matches!(m, Mark::Bold)));
    }

    #[test]
    fn test_blank_textblock() {
        assert!(Node::paragraph("   ").is_blank_textblock());
        assert!(Node::heading(2, "").is_blank_textblock());
        assert!(!Node::paragraph("x").is_blank_textblock());
        assert!(!Node::bullet_list(vec![]).is_blank_textblock());
    }
}
