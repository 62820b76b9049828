//! Structural list editing: indenting, outdenting and moving between items
//!
//! Nothing is stored between keystrokes; each operation re-derives its
//! context from the selection. Every operation is guarded and returns `None`
//! when it does not apply, leaving the document untouched.

use crate::{Command, EditError, Result, Transaction};
use doc_model::{DocumentTree, Node, NodeKind, NodePath, NodeType, Selection};
use serde::{Deserialize, Serialize};

// =============================================================================
// Helper Functions
// =============================================================================

/// A contiguous run of items `start..=end` inside one list
#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemRange {
    list: NodePath,
    start: usize,
    end: usize,
}

/// Where a collapsed cursor sits relative to the list structure around it
#[derive(Debug, Clone)]
struct CursorContext {
    /// Innermost textblock holding the cursor
    textblock: NodePath,
    /// Offset within the textblock's content
    offset: usize,
    /// Content size of the textblock
    textblock_size: usize,
    /// Innermost list item (or task item) ancestor
    item: NodePath,
    /// The list containing `item`
    list: NodePath,
    /// Index of `item` within `list`
    index: usize,
}

impl CursorContext {
    fn item_range(&self) -> ItemRange {
        ItemRange {
            list: self.list.clone(),
            start: self.index,
            end: self.index,
        }
    }

    /// The cursor is in the item's first child, which is a textblock
    fn in_first_textblock(&self) -> bool {
        self.textblock == self.item.child(0)
    }
}

fn cursor_context(tree: &DocumentTree, selection: &Selection) -> Option<CursorContext> {
    if !selection.is_collapsed() {
        return None;
    }
    let rp = tree.resolve(selection.focus).ok()?;
    let textblock = rp.parent();
    if !textblock.is_textblock() {
        return None;
    }
    let item_depth = rp.find_ancestor(|n| n.node_type().is_list_item())?;
    let item = rp.path(item_depth).clone();
    let list = item.parent()?;
    let index = item.last_index()?;
    Some(CursorContext {
        textblock: rp.path(rp.depth()).clone(),
        offset: rp.parent_offset(),
        textblock_size: textblock.content_size(),
        item,
        list,
        index,
    })
}

/// Items covered by the selection, within the deepest list holding both ends
fn selected_items(tree: &DocumentTree, selection: &Selection) -> Option<ItemRange> {
    let from = tree.resolve(selection.start()).ok()?;
    let to = tree.resolve(selection.end()).ok()?;
    let shared = from.depth().min(to.depth());
    (0..shared).rev().find_map(|d| {
        if from.path(d) != to.path(d) || !from.node(d).node_type().is_list() {
            return None;
        }
        Some(ItemRange {
            list: from.path(d).clone(),
            start: from.index(d),
            end: to.index(d),
        })
    })
}

/// Check whether the list at `list` is nested inside an item
fn is_nested_list(tree: &DocumentTree, list: &NodePath) -> bool {
    list.parent()
        .and_then(|p| tree.node(&p))
        .map(|n| n.node_type().is_list_item())
        .unwrap_or(false)
}

/// Index of the item's nested list, if it has one
fn nested_list_index(item: &Node) -> Option<usize> {
    item.content.iter().position(|c| c.node_type().is_list())
}

/// Append `items` to the item's nested list at `nested`, or give the item a
/// new nested list of `kind` when it has none
fn append_to_sublist(item: &mut Node, nested: Option<usize>, kind: NodeKind, items: Vec<Node>) {
    match nested {
        Some(i) => item.content[i].content.extend(items),
        None => item.content.push(Node::new(kind, items)),
    }
}

/// Convert an item to the item type a different list expects
fn retype_item(mut item: Node, item_type: NodeType) -> Node {
    if item.node_type() != item_type {
        item.kind = match item_type {
            NodeType::TaskItem => NodeKind::TaskItem { checked: false },
            _ => NodeKind::ListItem,
        };
    }
    item
}

fn textblock_paths(tree: &DocumentTree) -> Vec<NodePath> {
    let mut paths = Vec::new();
    tree.walk(&mut |path, node| {
        if node.is_textblock() {
            paths.push(path.clone());
        }
    });
    paths
}

/// Map a selection across a structural edit.
///
/// List restructuring never reorders, adds or drops textblocks, so a
/// position is carried over as (textblock ordinal, offset) and rebuilt
/// against the new tree.
fn map_selection(before: &DocumentTree, after: &DocumentTree, selection: &Selection) -> Selection {
    let before_paths = textblock_paths(before);
    let after_paths = textblock_paths(after);
    let map = |pos: usize| {
        let anchor = before.resolve(pos).ok().and_then(|rp| {
            if !rp.parent().is_textblock() {
                return None;
            }
            let ordinal = before_paths.iter().position(|p| p == rp.path(rp.depth()))?;
            Some((ordinal, rp.parent_offset()))
        });
        anchor
            .and_then(|(ordinal, offset)| {
                let path = after_paths.get(ordinal)?;
                Some(after.content_start(path)? + offset)
            })
            .unwrap_or_else(|| pos.min(after.size()))
    };
    Selection::new(map(selection.anchor), map(selection.focus))
}

fn structural_transaction(
    tree: &DocumentTree,
    next: DocumentTree,
    selection: &Selection,
) -> Transaction {
    let mapped = map_selection(tree, &next, selection);
    Transaction::content(next, mapped)
}

// =============================================================================
// Structural edits
// =============================================================================

/// Move items under their previous sibling, joining its nested list of the
/// same type or creating one
fn sink_items(tree: &DocumentTree, range: &ItemRange) -> Option<DocumentTree> {
    if range.start == 0 || range.start > range.end {
        return None;
    }
    let list = tree.node(&range.list)?;
    if range.end >= list.content.len() {
        return None;
    }
    let list_type = list.node_type();
    let prev = &list.content[range.start - 1];
    let nested = nested_list_index(prev);
    if nested.is_some_and(|i| prev.content[i].node_type() != list_type) {
        return None;
    }
    let kind = list.kind.clone();

    let mut next = tree.clone();
    let list = next.node_mut(&range.list)?;
    let moved: Vec<Node> = list.content.drain(range.start..=range.end).collect();
    let prev = list.content.get_mut(range.start - 1)?;
    append_to_sublist(prev, nested, kind, moved);
    Some(next)
}

/// Tab with a collapsed cursor on an item that carries a nested list of its
/// own list's type: the item and the items of that nested list all move
/// under the previous sibling, as siblings of each other.
fn merge_into_previous(tree: &DocumentTree, list_path: &NodePath, index: usize) -> Option<DocumentTree> {
    if index == 0 {
        return None;
    }
    let list = tree.node(list_path)?;
    let list_type = list.node_type();
    let sublist = list.content.get(index)?.find_child_of_type(list_type)?;
    let prev = &list.content[index - 1];
    let nested = nested_list_index(prev);
    if nested.is_some_and(|i| prev.content[i].node_type() != list_type) {
        return None;
    }
    let kind = list.kind.clone();

    let mut next = tree.clone();
    let list = next.node_mut(list_path)?;
    let mut item = list.content.remove(index);
    let detached = item.content.remove(sublist);
    let mut moved = Vec::with_capacity(detached.content.len() + 1);
    moved.push(item);
    moved.extend(detached.content);
    let prev = list.content.get_mut(index - 1)?;
    append_to_sublist(prev, nested, kind, moved);
    Some(next)
}

/// Lift items one level: into the outer list when nested, out of the list
/// entirely when top-level
fn lift_items(tree: &DocumentTree, range: &ItemRange) -> Option<DocumentTree> {
    let list = tree.node(&range.list)?;
    if range.start > range.end || range.end >= list.content.len() {
        return None;
    }
    let parent = range.list.parent()?;
    if is_nested_list(tree, &range.list) {
        lift_to_outer_list(tree, range, &parent)
    } else {
        lift_out_of_list(tree, range, &parent)
    }
}

fn lift_to_outer_list(
    tree: &DocumentTree,
    range: &ItemRange,
    parent_item: &NodePath,
) -> Option<DocumentTree> {
    let outer = parent_item.parent()?;
    let outer_item_type = tree.node(&outer)?.node_type().item_type()?;
    let item_index = parent_item.last_index()?;

    let mut next = tree.clone();
    let list = next.node_mut(&range.list)?;
    let kind = list.kind.clone();
    let trailing: Vec<Node> = list.content.drain(range.end + 1..).collect();
    let mut lifted: Vec<Node> = list.content.drain(range.start..).collect();
    let list_emptied = list.content.is_empty();

    // Siblings after the lifted range stay below the last lifted item
    if !trailing.is_empty() {
        let last = lifted.last_mut()?;
        let nested = nested_list_index(last);
        if nested.is_some_and(|i| last.content[i].kind.node_type() != kind.node_type()) {
            return None;
        }
        append_to_sublist(last, nested, kind, trailing);
    }

    if list_emptied {
        next.remove(&range.list).ok()?;
    }
    let outer_node = next.node_mut(&outer)?;
    outer_node.content.splice(
        item_index + 1..item_index + 1,
        lifted.into_iter().map(|item| retype_item(item, outer_item_type)),
    );
    Some(next)
}

fn lift_out_of_list(tree: &DocumentTree, range: &ItemRange, parent: &NodePath) -> Option<DocumentTree> {
    let list_index = range.list.last_index()?;
    let parent_type = tree.node(parent)?.node_type();
    let list = tree.node(&range.list)?;

    // The original list attrs stay with whichever part comes first
    let mut attrs = Some(list.attrs.clone());
    let mut replacement = Vec::new();
    if range.start > 0 {
        replacement.push(
            Node::new(list.kind.clone(), list.content[..range.start].to_vec())
                .with_attrs(attrs.take().unwrap_or_default()),
        );
    }
    for item in &list.content[range.start..=range.end] {
        replacement.extend(item.content.iter().cloned());
    }
    if range.end + 1 < list.content.len() {
        replacement.push(
            Node::new(list.kind.clone(), list.content[range.end + 1..].to_vec())
                .with_attrs(attrs.take().unwrap_or_default()),
        );
    }
    if !replacement
        .iter()
        .all(|n| parent_type.allows_child(n.node_type()))
    {
        return None;
    }

    let mut next = tree.clone();
    next.node_mut(parent)?
        .content
        .splice(list_index..=list_index, replacement);
    Some(next)
}

// =============================================================================
// Operations
// =============================================================================

/// Direction of cross-item movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalDirection {
    Up,
    Down,
}

/// Indent (Tab).
///
/// A range selection sinks every selected item. A collapsed cursor on an
/// item at index > 0 sinks it, or merges it with its own nested list when
/// that list has the same type as the item's list.
pub fn indent(tree: &DocumentTree, selection: &Selection) -> Option<Transaction> {
    let next = if selection.is_collapsed() {
        let ctx = cursor_context(tree, selection)?;
        if ctx.index == 0 {
            return None;
        }
        let list_type = tree.node(&ctx.list)?.node_type();
        let has_own_sublist = tree
            .node(&ctx.item)?
            .find_child_of_type(list_type)
            .is_some();
        if has_own_sublist {
            merge_into_previous(tree, &ctx.list, ctx.index)?
        } else {
            sink_items(tree, &ctx.item_range())?
        }
    } else {
        sink_items(tree, &selected_items(tree, selection)?)?
    };
    Some(structural_transaction(tree, next, selection))
}

/// Outdent (Shift-Tab): lift the selected items one level
pub fn outdent(tree: &DocumentTree, selection: &Selection) -> Option<Transaction> {
    let range = if selection.is_collapsed() {
        cursor_context(tree, selection)?.item_range()
    } else {
        selected_items(tree, selection)?
    };
    let next = lift_items(tree, &range)?;
    Some(structural_transaction(tree, next, selection))
}

/// Lift a nested item when the cursor sits at offset 0 of its first
/// textblock. With `require_empty` the textblock must also be empty (the
/// Enter flavour).
pub fn outdent_at_item_start(
    tree: &DocumentTree,
    selection: &Selection,
    require_empty: bool,
) -> Option<Transaction> {
    let ctx = cursor_context(tree, selection)?;
    if !ctx.in_first_textblock() || ctx.offset != 0 {
        return None;
    }
    if require_empty && ctx.textblock_size != 0 {
        return None;
    }
    if !is_nested_list(tree, &ctx.list) {
        return None;
    }
    let next = lift_items(tree, &ctx.item_range())?;
    Some(structural_transaction(tree, next, selection))
}

/// Enter inside an item whose first child is an empty paragraph lifts the
/// item, leaving the list when it was top-level
pub fn exit_empty_item(tree: &DocumentTree, selection: &Selection) -> Option<Transaction> {
    let ctx = cursor_context(tree, selection)?;
    let first = tree.node(&ctx.item)?.first_child()?;
    if first.node_type() != NodeType::Paragraph || first.content_size() != 0 {
        return None;
    }
    let next = lift_items(tree, &ctx.item_range())?;
    Some(structural_transaction(tree, next, selection))
}

/// Move a collapsed cursor from the end of an item's only textblock to the
/// end of the first textblock of the neighbouring item
pub fn move_to_sibling_item(
    tree: &DocumentTree,
    selection: &Selection,
    direction: VerticalDirection,
) -> Option<Transaction> {
    let ctx = cursor_context(tree, selection)?;
    if ctx.textblock.parent().as_ref() != Some(&ctx.item) || ctx.offset != ctx.textblock_size {
        return None;
    }
    if tree.node(&ctx.item)?.textblock_child_count() != 1 {
        return None;
    }
    let sibling_index = match direction {
        VerticalDirection::Up => ctx.index.checked_sub(1)?,
        VerticalDirection::Down => ctx.index + 1,
    };
    let sibling_path = ctx.list.child(sibling_index);
    let sibling = tree.node(&sibling_path)?;
    let first_textblock = sibling.content.iter().position(Node::is_textblock)?;
    let target = tree.content_end(&sibling_path.child(first_textblock))?;
    Some(Transaction::selection_only(tree, Selection::collapsed(target)).scroll_into_view())
}

fn not_applicable(name: &str) -> EditError {
    EditError::InvalidCommand(format!("{} does not apply at the selection", name))
}

// =============================================================================
// Commands
// =============================================================================

/// Indent list items (Tab)
#[derive(Debug, Clone, Copy, Default)]
pub struct IncreaseListIndent;

impl IncreaseListIndent {
    pub fn new() -> Self {
        Self
    }
}

impl Command for IncreaseListIndent {
    fn apply(&self, tree: &DocumentTree, selection: &Selection) -> Result<Transaction> {
        indent(tree, selection).ok_or_else(|| not_applicable(self.display_name()))
    }

    fn display_name(&self) -> &str {
        "Increase List Indent"
    }
}

/// Outdent list items (Shift-Tab)
#[derive(Debug, Clone, Copy, Default)]
pub struct DecreaseListIndent;

impl DecreaseListIndent {
    pub fn new() -> Self {
        Self
    }
}

impl Command for DecreaseListIndent {
    fn apply(&self, tree: &DocumentTree, selection: &Selection) -> Result<Transaction> {
        outdent(tree, selection).ok_or_else(|| not_applicable(self.display_name()))
    }

    fn display_name(&self) -> &str {
        "Decrease List Indent"
    }
}

/// Jump to the neighbouring list item
#[derive(Debug, Clone, Copy)]
pub struct MoveToSiblingItem {
    pub direction: VerticalDirection,
}

impl MoveToSiblingItem {
    pub fn new(direction: VerticalDirection) -> Self {
        Self { direction }
    }
}

impl Command for MoveToSiblingItem {
    fn apply(&self, tree: &DocumentTree, selection: &Selection) -> Result<Transaction> {
        move_to_sibling_item(tree, selection, self.direction)
            .ok_or_else(|| not_applicable(self.display_name()))
    }

    fn display_name(&self) -> &str {
        "Move To Sibling Item"
    }
}
