//! Find Engine
//!
//! Cross-block substring search over the document:
//! - `normalize_query` strips surrounding whitespace and one layer of quotes
//! - `FindEngine` flattens the textblocks and collects every match
//! - `FindState` + `reduce` keep the current match in step with transactions
//! - `decorations` describes how matches are highlighted

use doc_model::{DocumentTree, NodeKind, Range, Selection};
use serde::{Deserialize, Serialize};

/// Options for find operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Skip matches that directly follow a digit, so "23" does not hit "123"
    pub digit_guard: bool,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the digit guard
    pub fn digit_guard(mut self, value: bool) -> Self {
        self.digit_guard = value;
        self
    }
}

impl Default for FindOptions {
    fn default() -> Self {
        Self { digit_guard: true }
    }
}

const QUOTE_PAIRS: [(char, char); 5] = [
    ('"', '"'),
    ('\'', '\''),
    ('\u{201C}', '\u{201D}'),
    ('\u{2018}', '\u{2019}'),
    ('`', '`'),
];

/// Trim the query and strip one layer of matching quotes
pub fn normalize_query(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        if QUOTE_PAIRS.contains(&(first, last)) {
            return chars.as_str().trim().to_string();
        }
    }
    trimmed.to_string()
}

fn fold(c: char) -> impl Iterator<Item = char> {
    c.to_lowercase()
}

fn chars_equal(a: char, b: char) -> bool {
    a == b || fold(a).eq(fold(b))
}

/// A run of characters with no block boundary or hard break inside it
type Segment = Vec<(char, usize)>;

/// Searches a document tree
#[derive(Debug)]
pub struct FindEngine<'a> {
    tree: &'a DocumentTree,
}

impl<'a> FindEngine<'a> {
    pub fn new(tree: &'a DocumentTree) -> Self {
        Self { tree }
    }

    /// All matches of an already-normalized query, in document order.
    ///
    /// Overlapping matches are all reported. An empty query has no matches.
    pub fn find_all(&self, query: &str, options: &FindOptions) -> Vec<Range> {
        let needle: Vec<char> = query.chars().collect();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for segment in self.segments() {
            if segment.len() < needle.len() {
                continue;
            }
            for start in 0..=segment.len() - needle.len() {
                let window = &segment[start..start + needle.len()];
                if !window.iter().zip(&needle).all(|(&(c, _), &q)| chars_equal(c, q)) {
                    continue;
                }
                if options.digit_guard && start > 0 && segment[start - 1].0.is_ascii_digit() {
                    continue;
                }
                let from = window[0].1;
                let to = window[window.len() - 1].1 + 1;
                matches.push(Range::new(from, to));
            }
        }
        matches
    }

    fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        self.tree.walk(&mut |path, node| {
            if !node.is_textblock() {
                return;
            }
            let Some(mut pos) = self.tree.content_start(path) else {
                return;
            };
            let mut current = Segment::new();
            for child in &node.content {
                match &child.kind {
                    NodeKind::Text(run) => {
                        for c in run.text.chars() {
                            current.push((c, pos));
                            pos += 1;
                        }
                    }
                    _ => {
                        if !current.is_empty() {
                            segments.push(std::mem::take(&mut current));
                        }
                        pos += child.node_size();
                    }
                }
            }
            if !current.is_empty() {
                segments.push(current);
            }
        });
        segments
    }
}

/// Find state change carried by a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindMeta {
    /// Replace the query (raw, normalized by the reducer)
    SetQuery(String),
    Next,
    Prev,
    Clear,
}

/// Current search: the normalized query, its matches and the selected one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindState {
    pub query: String,
    pub matches: Vec<Range>,
    pub current: Option<usize>,
}

impl FindState {
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// The selected match
    pub fn current_match(&self) -> Option<Range> {
        self.current.and_then(|i| self.matches.get(i).copied())
    }

    /// Selection spanning the selected match
    pub fn current_selection(&self) -> Option<Selection> {
        self.current_match().map(|r| Selection::new(r.start, r.end))
    }

    /// Highlights for every match, the current one marked distinctly
    pub fn decorations(&self) -> Vec<Decoration> {
        self.matches
            .iter()
            .enumerate()
            .map(|(i, &range)| Decoration {
                range,
                kind: if Some(i) == self.current {
                    DecorationKind::CurrentMatch
                } else {
                    DecorationKind::Match
                },
            })
            .collect()
    }
}

/// Highlight class of a decorated range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorationKind {
    Match,
    CurrentMatch,
}

/// An inline highlight over a position range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub range: Range,
    pub kind: DecorationKind,
}

/// Compute the next find state.
///
/// `meta` is the find metadata of the transaction (if any), `doc` the
/// document after it and `doc_changed` whether its content changed. Pure:
/// the same inputs always produce the same state.
pub fn reduce(
    prev: &FindState,
    meta: Option<&FindMeta>,
    doc: &DocumentTree,
    doc_changed: bool,
    options: &FindOptions,
) -> FindState {
    match meta {
        Some(FindMeta::SetQuery(raw)) => {
            let query = normalize_query(raw);
            let matches = FindEngine::new(doc).find_all(&query, options);
            let current = if matches.is_empty() { None } else { Some(0) };
            FindState {
                query,
                matches,
                current,
            }
        }
        Some(FindMeta::Next) => step(prev, true),
        Some(FindMeta::Prev) => step(prev, false),
        Some(FindMeta::Clear) => FindState::default(),
        None if doc_changed && prev.is_active() => {
            let matches = FindEngine::new(doc).find_all(&prev.query, options);
            let current = match (prev.current, matches.len()) {
                (_, 0) => None,
                (Some(i), n) => Some(i.min(n - 1)),
                (None, _) => None,
            };
            FindState {
                query: prev.query.clone(),
                matches,
                current,
            }
        }
        None => prev.clone(),
    }
}

fn step(prev: &FindState, forward: bool) -> FindState {
    let n = prev.matches.len();
    if n == 0 {
        return prev.clone();
    }
    let current = match (prev.current, forward) {
        (Some(i), true) => (i + 1) % n,
        (Some(i), false) => (i + n - 1) % n,
        (None, true) => 0,
        (None, false) => n - 1,
    };
    FindState {
        current: Some(current),
        ..prev.clone()
    }
}
