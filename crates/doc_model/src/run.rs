//! Text runs and inline marks

use serde::{Deserialize, Serialize};

/// Inline formatting mark applied to a text run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "crate::json::RawMark", into = "crate::json::RawMark")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    /// Background highlight; `None` uses the editor's default color
    Highlight { color: Option<String> },
    Link { href: String },
    TextColor { color: String },
}

impl Mark {
    /// The serialized `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
            Mark::Strike => "strike",
            Mark::Highlight { .. } => "highlight",
            Mark::Link { .. } => "link",
            Mark::TextColor { .. } => "textColor",
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, Mark::Bold)
    }
}

/// A text run - contiguous text with a consistent set of marks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl TextRun {
    /// Create a new run with text content
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Create a new run with text and marks
    pub fn with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    /// Length of the run in position space (characters)
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Check if this run is empty
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Check whether a mark of the same type is present
    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.marks.iter().any(|m| m.name() == mark.name())
    }

    /// Byte offset of the character at `char_offset` (or the end of the text)
    pub fn byte_offset(&self, char_offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_offset)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_length_counts_characters() {
        let run = TextRun::new("héllo");
        assert_eq!(run.len(), 5);
        assert_eq!(run.byte_offset(2), 3);
        assert_eq!(run.byte_offset(10), run.text.len());
    }

    #[test]
    fn test_has_mark_ignores_attrs() {
        let run = TextRun::with_marks(
            "x",
            vec![Mark::Highlight {
                color: Some("#ff0".to_string()),
            }],
        );
        assert!(run.has_mark(&Mark::Highlight { color: None }));
        assert!(!run.has_mark(&Mark::Bold));
    }
}
