//! Selection model - cursor position and text selection in position space

use serde::{Deserialize, Serialize};

/// A selection in the document
///
/// A selection has an anchor (where the selection started) and a focus
/// (where the selection ends / where the caret is). When anchor == focus,
/// the selection is collapsed (just a caret).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Where the selection started
    pub anchor: usize,
    /// Where the selection ends (caret position)
    pub focus: usize,
}

impl Selection {
    /// Create a new selection
    pub fn new(anchor: usize, focus: usize) -> Self {
        Self { anchor, focus }
    }

    /// Create a collapsed selection (caret only)
    pub fn collapsed(pos: usize) -> Self {
        Self {
            anchor: pos,
            focus: pos,
        }
    }

    /// Check if this selection is collapsed (just a caret)
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Get the start position of the selection (regardless of direction)
    pub fn start(&self) -> usize {
        self.anchor.min(self.focus)
    }

    /// Get the end position of the selection (regardless of direction)
    pub fn end(&self) -> usize {
        self.anchor.max(self.focus)
    }

    /// Move the focus, extending the selection
    pub fn extend_to(&self, focus: usize) -> Self {
        Self {
            anchor: self.anchor,
            focus,
        }
    }

    /// Collapse the selection to the focus position
    pub fn collapse_to_focus(&self) -> Self {
        Self::collapsed(self.focus)
    }

    /// Clamp both ends into `[0, size]`
    pub fn clamp(&self, size: usize) -> Self {
        Self {
            anchor: self.anchor.min(size),
            focus: self.focus.min(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backward_selection_bounds() {
        let sel = Selection::new(9, 3);
        assert_eq!(sel.start(), 3);
        assert_eq!(sel.end(), 9);
        assert!(!sel.is_collapsed());
        assert!(sel.collapse_to_focus().is_collapsed());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(Selection::new(2, 40).clamp(10), Selection::new(2, 10));
    }
}
