//! Key handling for structural list editing

use crate::list_commands::{
    exit_empty_item, indent, move_to_sibling_item, outdent, outdent_at_item_start,
    VerticalDirection,
};
use crate::Transaction;
use doc_model::{DocumentTree, Selection};
use serde::{Deserialize, Serialize};

/// Keys the list editor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Backspace,
    Tab,
    ShiftTab,
    ArrowUp,
    ArrowDown,
}

/// Result of offering a key to a handler
#[derive(Debug, Clone)]
pub enum KeyOutcome {
    /// The key was consumed and produced this transaction
    Handled(Transaction),
    /// The key does not apply here; the host's default behavior should run
    Unhandled,
}

impl KeyOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, KeyOutcome::Handled(_))
    }
}

impl From<Option<Transaction>> for KeyOutcome {
    fn from(tx: Option<Transaction>) -> Self {
        tx.map_or(KeyOutcome::Unhandled, KeyOutcome::Handled)
    }
}

/// Routes keys to the list operations in priority order
#[derive(Debug, Clone, Copy, Default)]
pub struct ListKeymap;

impl ListKeymap {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, key: Key, tree: &DocumentTree, selection: &Selection) -> KeyOutcome {
        let outcome: KeyOutcome = match key {
            // Outdent-at-start wins over the generic exit-on-empty rule
            Key::Enter => outdent_at_item_start(tree, selection, true)
                .or_else(|| exit_empty_item(tree, selection))
                .into(),
            Key::Backspace => outdent_at_item_start(tree, selection, false).into(),
            Key::Tab => indent(tree, selection).into(),
            Key::ShiftTab => outdent(tree, selection).into(),
            Key::ArrowUp => move_to_sibling_item(tree, selection, VerticalDirection::Up).into(),
            Key::ArrowDown => {
                move_to_sibling_item(tree, selection, VerticalDirection::Down).into()
            }
        };
        tracing::trace!(?key, handled = outcome.is_handled(), "list keymap");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list_commands::tests::{cursor_in, outline};
    use doc_model::Node;

    fn nested_with_empty_tail() -> DocumentTree {
        DocumentTree::from_root(Node::doc(vec![Node::bullet_list(vec![Node::list_item(
            vec![
                Node::paragraph("a"),
                Node::bullet_list(vec![
                    Node::list_item(vec![Node::paragraph("b")]),
                    Node::list_item(vec![Node::paragraph("")]),
                ]),
            ],
        )])]))
        .unwrap()
    }

    #[test]
    fn test_enter_on_empty_nested_item_outdents_one_level() {
        let tree = nested_with_empty_tail();
        let sel = Selection::collapsed(cursor_in(&tree, "", 0));
        match ListKeymap::new().handle(Key::Enter, &tree, &sel) {
            KeyOutcome::Handled(tx) => {
                // One level only: still inside the outer list
                assert_eq!(outline(tx.tree.root()), "ul(li(p:a ul(li(p:b))) li(p:))");
            }
            KeyOutcome::Unhandled => panic!("enter should outdent"),
        }
    }

    #[test]
    fn test_enter_in_non_empty_item_is_unhandled() {
        let tree = nested_with_empty_tail();
        let sel = Selection::collapsed(cursor_in(&tree, "b", 1));
        assert!(!ListKeymap::new().handle(Key::Enter, &tree, &sel).is_handled());
    }

    #[test]
    fn test_backspace_and_shift_tab() {
        let tree = nested_with_empty_tail();
        let sel = Selection::collapsed(cursor_in(&tree, "b", 0));
        let keymap = ListKeymap::new();
        assert!(keymap.handle(Key::Backspace, &tree, &sel).is_handled());
        assert!(keymap.handle(Key::ShiftTab, &tree, &sel).is_handled());
        assert!(!keymap.handle(Key::Tab, &tree, &sel).is_handled());
    }

    #[test]
    fn test_arrow_keys_route_to_sibling_movement() {
        let tree = nested_with_empty_tail();
        let sel = Selection::collapsed(cursor_in(&tree, "b", 1));
        match ListKeymap::new().handle(Key::ArrowDown, &tree, &sel) {
            KeyOutcome::Handled(tx) => {
                assert_eq!(tx.selection, Selection::collapsed(cursor_in(&tree, "", 0)))
            }
            KeyOutcome::Unhandled => panic!("arrow down should move"),
        }
    }
}
