//! AI content placement
//!
//! Turns an AI insert payload into highlighted blocks and decides where in
//! the document they go relative to a target block:
//!
//! 1. merge into a list of the same type (the target item's nested list,
//!    the enclosing list, or a list adjacent to the target across blank
//!    paragraphs and headings)
//! 2. append directly after the target
//! 3. append after the innermost ancestor that accepts the blocks
//!
//! Without a usable target the content goes under a bold fallback header at
//! the top of the document.

use crate::{EditError, PlacementSettings, Result};
use doc_model::{BlockId, DocumentTree, IdGenerator, Mark, Node, NodePath, NodeType};
use serde::{Deserialize, Serialize};

/// Payload produced by the AI assistant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsertPayload {
    /// Block the content relates to
    pub target_block_id: Option<String>,
    /// `bullet_list`, `task_list` or `paragraphs`
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
}

impl AiInsertPayload {
    pub fn new(target_block_id: Option<&str>, format: &str, items: &[&str]) -> Self {
        Self {
            target_block_id: target_block_id.map(str::to_string),
            format: Some(format.to_string()),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Trimmed items with blanks dropped
    pub fn cleaned_items(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn insert_format(&self) -> InsertFormat {
        InsertFormat::parse(self.format.as_deref())
    }

    fn target(&self) -> Option<BlockId> {
        self.target_block_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(BlockId::from)
    }
}

/// Shape of the synthesized content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertFormat {
    #[default]
    BulletList,
    TaskList,
    Paragraphs,
}

impl InsertFormat {
    /// Parse a format name; anything unknown is a bullet list
    pub fn parse(name: Option<&str>) -> Self {
        match name {
            Some("task_list") => InsertFormat::TaskList,
            Some("paragraphs") => InsertFormat::Paragraphs,
            _ => InsertFormat::BulletList,
        }
    }

    /// List type the content is wrapped in, if any
    pub fn wrapper_type(&self) -> Option<NodeType> {
        match self {
            InsertFormat::BulletList => Some(NodeType::BulletList),
            InsertFormat::TaskList => Some(NodeType::TaskList),
            InsertFormat::Paragraphs => None,
        }
    }
}

/// How the insert position was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// No target; after the existing fallback header
    FallbackAfterHeader,
    /// No target; a new fallback header was created at the top
    FallbackNewHeader,
    /// Appended to the nested list of the target's item
    MergeIntoSublist,
    /// Appended to the list enclosing the target
    MergeIntoList,
    /// Appended to a list next to the target
    MergeAdjacent,
    /// Directly after the target block
    AfterTarget,
    /// After an ancestor of the target
    AfterAncestor,
    /// No valid anchor; end of the document
    DocumentEnd,
}

/// Where content was inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementOutcome {
    /// Insert position, within `[0, size]` of the original document
    pub position: usize,
    /// Total size of the inserted nodes
    pub inserted_size: usize,
    pub strategy: PlacementStrategy,
}

/// A document with the content inserted
#[derive(Debug, Clone)]
pub struct PlacementResult {
    pub tree: DocumentTree,
    pub outcome: PlacementOutcome,
}

/// Nodes to insert and where
#[derive(Debug)]
struct Placement {
    position: usize,
    nodes: Vec<Node>,
    strategy: PlacementStrategy,
}

/// Resolves where AI content goes and inserts it
#[derive(Debug, Clone, Copy)]
pub struct ContentPlacer<'a> {
    settings: &'a PlacementSettings,
}

impl<'a> ContentPlacer<'a> {
    pub fn new(settings: &'a PlacementSettings) -> Self {
        Self { settings }
    }

    /// Validate the payload, synthesize its blocks and insert them
    pub fn place(
        &self,
        tree: &DocumentTree,
        payload: &AiInsertPayload,
        ids: &mut dyn IdGenerator,
    ) -> Result<PlacementResult> {
        let items = payload.cleaned_items();
        if items.is_empty() {
            return Err(EditError::InvalidPayload(
                "items are empty after removing blanks".to_string(),
            ));
        }
        let format = payload.insert_format();
        let blocks = self.synthesize(format, &items, ids);

        let target = payload.target().and_then(|id| tree.find_block(&id));
        let placement = match &target {
            Some(path) => self.plan_at_target(tree, path, format, blocks),
            None => {
                if payload.target().is_some() {
                    tracing::debug!(
                        target_block_id = ?payload.target_block_id,
                        "placement target not found, using fallback"
                    );
                }
                self.plan_fallback(tree, blocks, ids)
            }
        };

        let position = placement.position.min(tree.size());
        let inserted_size: usize = placement.nodes.iter().map(Node::node_size).sum();
        let mut next = tree.clone();
        next.insert_at(position, placement.nodes)?;
        tracing::debug!(
            ?format,
            strategy = ?placement.strategy,
            position,
            inserted_size,
            "placed AI content"
        );

        Ok(PlacementResult {
            tree: next,
            outcome: PlacementOutcome {
                position,
                inserted_size,
                strategy: placement.strategy,
            },
        })
    }

    /// Build the blocks for `items`, each with a fresh identity and every
    /// text run highlighted
    pub fn synthesize(
        &self,
        format: InsertFormat,
        items: &[String],
        ids: &mut dyn IdGenerator,
    ) -> Vec<Node> {
        match format {
            InsertFormat::Paragraphs => items
                .iter()
                .map(|t| self.highlighted_paragraph(t, ids))
                .collect(),
            InsertFormat::BulletList => {
                let list_attrs = ids.fresh_attrs();
                let items = items
                    .iter()
                    .map(|t| {
                        let p = self.highlighted_paragraph(t, ids);
                        Node::list_item(vec![p]).with_attrs(ids.fresh_attrs())
                    })
                    .collect();
                vec![Node::bullet_list(items).with_attrs(list_attrs)]
            }
            InsertFormat::TaskList => {
                let list_attrs = ids.fresh_attrs();
                let items = items
                    .iter()
                    .map(|t| {
                        let p = self.highlighted_paragraph(t, ids);
                        Node::task_item(false, vec![p]).with_attrs(ids.fresh_attrs())
                    })
                    .collect();
                vec![Node::task_list(items).with_attrs(list_attrs)]
            }
        }
    }

    fn highlighted_paragraph(&self, text: &str, ids: &mut dyn IdGenerator) -> Node {
        Node::paragraph_with(vec![Node::text_with_marks(text, vec![self.highlight()])])
            .with_attrs(ids.fresh_attrs())
    }

    fn highlight(&self) -> Mark {
        Mark::Highlight {
            color: self.settings.highlight_color.clone(),
        }
    }

    // =========================================================================
    // Target resolution
    // =========================================================================

    fn plan_fallback(&self, tree: &DocumentTree, blocks: Vec<Node>, ids: &mut dyn IdGenerator) -> Placement {
        let header = &self.settings.fallback_header;
        let first = NodePath::root().child(0);
        if tree.root().first_child().is_some_and(|n| self.is_fallback_header(n)) {
            if let Some(range) = tree.range_of(&first) {
                return Placement {
                    position: range.end,
                    nodes: blocks,
                    strategy: PlacementStrategy::FallbackAfterHeader,
                };
            }
        }

        let header_node =
            Node::paragraph_with(vec![Node::text_with_marks(header.as_str(), vec![Mark::Bold])])
                .with_attrs(ids.fresh_attrs());
        let mut nodes = Vec::with_capacity(blocks.len() + 1);
        nodes.push(header_node);
        nodes.extend(blocks);
        Placement {
            position: 0,
            nodes,
            strategy: PlacementStrategy::FallbackNewHeader,
        }
    }

    /// A bold paragraph reading the fallback header, ignoring case and
    /// surrounding whitespace
    fn is_fallback_header(&self, node: &Node) -> bool {
        node.node_type() == NodeType::Paragraph
            && node.all_text_marked(Mark::is_bold)
            && node.text_content().trim().to_lowercase()
                == self.settings.fallback_header.trim().to_lowercase()
    }

    fn plan_at_target(
        &self,
        tree: &DocumentTree,
        target: &NodePath,
        format: InsertFormat,
        blocks: Vec<Node>,
    ) -> Placement {
        if let Some(wrapper) = format.wrapper_type() {
            let merge = enclosing_list(tree, target, wrapper)
                .or_else(|| adjacent_list(tree, target, wrapper));
            if let Some((list, strategy)) = merge {
                if let Some(position) = tree.content_end(&list) {
                    let items: Vec<Node> = blocks.into_iter().flat_map(|b| b.content).collect();
                    return Placement {
                        position,
                        nodes: items,
                        strategy,
                    };
                }
            }
        }

        if let Some(position) = after_if_valid(tree, target, &blocks) {
            return Placement {
                position,
                nodes: blocks,
                strategy: PlacementStrategy::AfterTarget,
            };
        }

        let mut ancestor = target.parent();
        while let Some(path) = ancestor.filter(|p| !p.is_root()) {
            let structural = tree
                .node(&path)
                .map(|n| n.node_type().is_table_structural())
                .unwrap_or(true);
            if !structural {
                if let Some(position) = after_if_valid(tree, &path, &blocks) {
                    return Placement {
                        position,
                        nodes: blocks,
                        strategy: PlacementStrategy::AfterAncestor,
                    };
                }
            }
            ancestor = path.parent();
        }

        Placement {
            position: tree.size(),
            nodes: blocks,
            strategy: PlacementStrategy::DocumentEnd,
        }
    }
}

/// Position right after `path` when `blocks` may be inserted there
fn after_if_valid(tree: &DocumentTree, path: &NodePath, blocks: &[Node]) -> Option<usize> {
    let parent = path.parent()?;
    let index = path.last_index()?;
    if !tree.can_insert(&parent, index + 1, blocks) {
        return None;
    }
    tree.range_of(path).map(|r| r.end)
}

/// Walk from the target outwards looking for a list of the wrapper type.
///
/// An item of the wrapper's item type with a nested wrapper list yields that
/// nested list; a wrapper list yields itself. Lists of another type and
/// table structures end the walk, and past the target itself only list
/// items are climbed.
fn enclosing_list(
    tree: &DocumentTree,
    target: &NodePath,
    wrapper: NodeType,
) -> Option<(NodePath, PlacementStrategy)> {
    let item_type = wrapper.item_type()?;
    let mut current = Some(target.clone());
    let mut at_target = true;
    while let Some(path) = current.filter(|p| !p.is_root()) {
        let node = tree.node(&path)?;
        let node_type = node.node_type();
        if node_type.is_table_structural() {
            return None;
        }
        if node_type == item_type {
            if let Some(i) = node.find_child_of_type(wrapper) {
                return Some((path.child(i), PlacementStrategy::MergeIntoSublist));
            }
        }
        if node_type == wrapper {
            return Some((path, PlacementStrategy::MergeIntoList));
        }
        if node_type.is_list() || (!at_target && !node_type.is_list_item()) {
            return None;
        }
        at_target = false;
        current = path.parent();
    }
    None
}

/// Look for a wrapper list beside a paragraph or heading target, skipping
/// blank paragraphs and headings; forward first, then backward
fn adjacent_list(
    tree: &DocumentTree,
    target: &NodePath,
    wrapper: NodeType,
) -> Option<(NodePath, PlacementStrategy)> {
    let node = tree.node(target)?;
    if !matches!(node.node_type(), NodeType::Paragraph | NodeType::Heading) {
        return None;
    }
    let parent = target.parent()?;
    let index = target.last_index()?;
    let siblings = &tree.node(&parent)?.content;

    let forward = first_non_blank(siblings, index + 1..siblings.len());
    let backward = || first_non_blank(siblings, (0..index).rev());
    forward
        .filter(|&i| siblings[i].node_type() == wrapper)
        .or_else(|| backward().filter(|&i| siblings[i].node_type() == wrapper))
        .map(|i| (parent.child(i), PlacementStrategy::MergeAdjacent))
}

/// First sibling among `indices` that is not a blank paragraph or heading
fn first_non_blank(siblings: &[Node], mut indices: impl Iterator<Item = usize>) -> Option<usize> {
    indices.find(|&i| {
        let n = &siblings[i];
        !(matches!(n.node_type(), NodeType::Paragraph | NodeType::Heading) && n.is_blank_textblock())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use doc_model::{CellAttrs, NodeKind, SequentialGenerator};

    fn ids() -> SequentialGenerator {
        SequentialGenerator::new("ai", Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
    }

    fn tree(blocks: Vec<Node>) -> DocumentTree {
        DocumentTree::from_root(Node::doc(blocks)).unwrap()
    }

    fn place(tree: &DocumentTree, payload: &AiInsertPayload) -> Result<PlacementResult> {
        let settings = PlacementSettings::default();
        ContentPlacer::new(&settings).place(tree, payload, &mut ids())
    }

    fn bold_header(text: &str) -> Node {
        Node::paragraph_with(vec![Node::text_with_marks(text, vec![Mark::Bold])])
    }

    #[test]
    fn test_blank_items_are_rejected() {
        let doc = tree(vec![Node::paragraph("x")]);
        let err = place(&doc, &AiInsertPayload::new(None, "bullet_list", &[" ", ""])).unwrap_err();
        assert!(matches!(err, EditError::InvalidPayload(_)));
        assert!(place(&doc, &AiInsertPayload::new(None, "bullet_list", &[])).is_err());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(InsertFormat::parse(Some("task_list")), InsertFormat::TaskList);
        assert_eq!(InsertFormat::parse(Some("paragraphs")), InsertFormat::Paragraphs);
        assert_eq!(InsertFormat::parse(Some("table")), InsertFormat::BulletList);
        assert_eq!(InsertFormat::parse(None), InsertFormat::BulletList);
    }

    #[test]
    fn test_payload_deserializes_camel_case() {
        let payload: AiInsertPayload = serde_json::from_str(
            r#"{"targetBlockId": null, "format": "task_list", "items": [" a ", "  ", "b"]}"#,
        )
        .unwrap();
        assert_eq!(payload.target_block_id, None);
        assert_eq!(payload.insert_format(), InsertFormat::TaskList);
        assert_eq!(payload.cleaned_items(), vec!["a", "b"]);
    }

    #[test]
    fn test_synthesized_blocks_are_highlighted_with_ids() {
        let settings = PlacementSettings {
            highlight_color: Some("#ff0".to_string()),
            ..Default::default()
        };
        let blocks = ContentPlacer::new(&settings).synthesize(
            InsertFormat::TaskList,
            &["one".to_string(), "two".to_string()],
            &mut ids(),
        );
        assert_eq!(blocks.len(), 1);
        let list = &blocks[0];
        assert_eq!(list.node_type(), NodeType::TaskList);
        let mut blocks_seen = 0;
        list.descendants(&mut |n| {
            if n.node_type().is_block() {
                blocks_seen += 1;
                assert!(n.attrs.has_identity());
            }
            if n.node_type() == NodeType::TaskItem {
                assert_eq!(n.kind, NodeKind::TaskItem { checked: false });
            }
            if let Some(run) = n.as_text() {
                assert_eq!(
                    run.marks,
                    vec![Mark::Highlight {
                        color: Some("#ff0".to_string())
                    }]
                );
            }
        });
        // list + 2 items + 2 paragraphs
        assert_eq!(blocks_seen, 5);
    }

    #[test]
    fn test_fallback_creates_header_at_top() {
        let doc = tree(vec![Node::paragraph("notes")]);
        let result = place(&doc, &AiInsertPayload::new(None, "paragraphs", &["x"])).unwrap();
        let root = result.tree.root();
        assert_eq!(result.outcome.strategy, PlacementStrategy::FallbackNewHeader);
        assert_eq!(result.outcome.position, 0);
        assert_eq!(root.content[0].text_content(), "Uncategorized");
        assert!(root.content[0].all_text_marked(Mark::is_bold));
        assert!(root.content[0].attrs.has_identity());
        assert_eq!(root.content[1].text_content(), "x");
        assert_eq!(root.content[2].text_content(), "notes");
    }

    #[test]
    fn test_fallback_bullet_list_without_header() {
        let doc = tree(vec![Node::paragraph("notes")]);
        let result = place(&doc, &AiInsertPayload::new(None, "bullet_list", &["Buy milk"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::FallbackNewHeader);
        assert_eq!(result.outcome.position, 0);
        let root = result.tree.root();
        assert_eq!(root.child_count(), 3);
        assert_eq!(root.content[0].text_content(), "Uncategorized");
        assert!(root.content[0].all_text_marked(Mark::is_bold));
        let list = &root.content[1];
        assert_eq!(list.node_type(), NodeType::BulletList);
        assert_eq!(list.child_count(), 1);
        assert_eq!(list.content[0].node_type(), NodeType::ListItem);
        assert_eq!(list.content[0].text_content(), "Buy milk");
        assert_eq!(root.content[2].text_content(), "notes");
    }

    #[test]
    fn test_fallback_reuses_existing_header() {
        let doc = tree(vec![bold_header(" uncategorized "), Node::paragraph("notes")]);
        let result = place(
            &doc,
            &AiInsertPayload::new(Some("missing"), "bullet_list", &["x"]),
        )
        .unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::FallbackAfterHeader);
        // Header paragraph spans 0..17
        assert_eq!(result.outcome.position, 17);
        let root = result.tree.root();
        assert_eq!(root.child_count(), 3);
        assert_eq!(root.content[1].node_type(), NodeType::BulletList);
    }

    #[test]
    fn test_non_bold_header_is_not_reused() {
        let doc = tree(vec![Node::paragraph("Uncategorized")]);
        let result = place(&doc, &AiInsertPayload::new(None, "paragraphs", &["x"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::FallbackNewHeader);
        assert_eq!(result.tree.root().child_count(), 3);
    }

    #[test]
    fn test_merge_into_enclosing_list() {
        let doc = tree(vec![Node::bullet_list(vec![
            Node::list_item(vec![Node::paragraph("a").with_id("pa")]),
            Node::list_item(vec![Node::paragraph("b")]),
        ])
        .with_id("ul")]);
        let result = place(&doc, &AiInsertPayload::new(Some("pa"), "bullet_list", &["x", "y"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::MergeIntoList);
        let list = &result.tree.root().content[0];
        assert_eq!(result.tree.root().child_count(), 1);
        assert_eq!(list.child_count(), 4);
        assert_eq!(list.content[3].text_content(), "y");
    }

    #[test]
    fn test_merge_into_item_sublist() {
        let doc = tree(vec![Node::bullet_list(vec![Node::list_item(vec![
            Node::paragraph("a"),
            Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("a1")])]),
        ])
        .with_id("item")])]);
        let result = place(&doc, &AiInsertPayload::new(Some("item"), "bullet_list", &["x"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::MergeIntoSublist);
        let sublist = result
            .tree
            .node(&NodePath::from_indices(vec![0, 0, 1]))
            .unwrap();
        assert_eq!(sublist.child_count(), 2);
        assert_eq!(sublist.content[1].text_content(), "x");
    }

    #[test]
    fn test_mismatched_list_falls_back_to_ancestor() {
        let doc = tree(vec![
            Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("a")]).with_id("item")]),
            Node::paragraph("after"),
        ]);
        let result = place(&doc, &AiInsertPayload::new(Some("item"), "task_list", &["x"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::AfterAncestor);
        let root = result.tree.root();
        assert_eq!(root.content[1].node_type(), NodeType::TaskList);
        assert_eq!(root.content[2].text_content(), "after");
    }

    #[test]
    fn test_quote_inside_item_does_not_merge_into_list() {
        let doc = tree(vec![Node::bullet_list(vec![Node::list_item(vec![
            Node::paragraph("a"),
            Node::new(NodeKind::Blockquote, vec![Node::paragraph("q").with_id("q")]),
        ])])]);
        let result = place(&doc, &AiInsertPayload::new(Some("q"), "bullet_list", &["x"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::AfterTarget);
        let list = &result.tree.root().content[0];
        assert_eq!(list.child_count(), 1);
        let quote = result
            .tree
            .node(&NodePath::from_indices(vec![0, 0, 1]))
            .unwrap();
        assert_eq!(quote.child_count(), 2);
        assert_eq!(quote.content[1].node_type(), NodeType::BulletList);
    }

    #[test]
    fn test_merge_adjacent_across_blank_blocks() {
        let doc = tree(vec![
            Node::heading(2, "Todo").with_id("h"),
            Node::paragraph("  "),
            Node::heading(3, ""),
            Node::task_list(vec![Node::task_item(true, vec![Node::paragraph("done")])]),
        ]);
        let result = place(&doc, &AiInsertPayload::new(Some("h"), "task_list", &["new"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::MergeAdjacent);
        let list = &result.tree.root().content[3];
        assert_eq!(list.child_count(), 2);

        // Backward scan
        let doc = tree(vec![
            Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("a")])]),
            Node::paragraph(""),
            Node::paragraph("target").with_id("t"),
        ]);
        let result = place(&doc, &AiInsertPayload::new(Some("t"), "bullet_list", &["x"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::MergeAdjacent);
        assert_eq!(result.tree.root().content[0].child_count(), 2);
    }

    #[test]
    fn test_adjacent_scan_stops_at_content() {
        let doc = tree(vec![
            Node::paragraph("target").with_id("t"),
            Node::paragraph("words"),
            Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("a")])]),
        ]);
        let result = place(&doc, &AiInsertPayload::new(Some("t"), "bullet_list", &["x"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::AfterTarget);
        assert_eq!(result.outcome.position, 8);
        let root = result.tree.root();
        assert_eq!(root.child_count(), 4);
        assert_eq!(root.content[1].node_type(), NodeType::BulletList);
    }

    #[test]
    fn test_table_cell_target_appends_inside_cell() {
        let cell = Node::new(
            NodeKind::TableCell(CellAttrs::default()),
            vec![Node::paragraph("cell").with_id("c")],
        );
        let row = Node::new(NodeKind::TableRow, vec![cell]).with_id("row");
        let doc = tree(vec![Node::new(NodeKind::Table, vec![row])]);

        let result = place(&doc, &AiInsertPayload::new(Some("c"), "bullet_list", &["x"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::AfterTarget);
        let cell = result
            .tree
            .node(&NodePath::from_indices(vec![0, 0, 0]))
            .unwrap();
        assert_eq!(cell.child_count(), 2);

        // A row cannot take blocks and table ancestors are skipped
        let result = place(&doc, &AiInsertPayload::new(Some("row"), "paragraphs", &["x"])).unwrap();
        assert_eq!(result.outcome.strategy, PlacementStrategy::DocumentEnd);
        assert_eq!(result.outcome.position, doc.size());
    }
}
