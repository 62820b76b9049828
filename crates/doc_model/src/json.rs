//! JSON wire shape of nodes and marks
//!
//! Nodes are exchanged as `{ type, attrs, content, marks, text }`. The typed
//! model in [`crate::node`] converts to and from these raw records; attributes
//! the model does not know are carried through untouched.

use crate::{BlockAttrs, BlockId, CellAttrs, DocModelError, ImageAttrs, Mark, Node, NodeKind, NodeType, TextRun};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ATTR_ID: &str = "id";
const ATTR_CREATED_AT: &str = "created_at";

/// Untyped node record as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<RawNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<RawMark>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Untyped mark record as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

// =============================================================================
// Marks
// =============================================================================

fn take_string(attrs: &mut Map<String, Value>, key: &str) -> Option<String> {
    match attrs.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn take_u64(attrs: &mut Map<String, Value>, key: &str) -> Option<u64> {
    attrs.remove(key).and_then(|v| v.as_u64())
}

impl TryFrom<RawMark> for Mark {
    type Error = DocModelError;

    fn try_from(raw: RawMark) -> Result<Self, Self::Error> {
        let mut attrs = raw.attrs;
        let mark = match raw.mark_type.as_str() {
            "bold" => Mark::Bold,
            "italic" => Mark::Italic,
            "underline" => Mark::Underline,
            "strike" => Mark::Strike,
            "highlight" => Mark::Highlight {
                color: take_string(&mut attrs, "color"),
            },
            "link" => Mark::Link {
                href: take_string(&mut attrs, "href").unwrap_or_default(),
            },
            "textColor" => Mark::TextColor {
                color: take_string(&mut attrs, "color").unwrap_or_default(),
            },
            other => return Err(DocModelError::UnknownMarkType(other.to_string())),
        };
        Ok(mark)
    }
}

impl From<Mark> for RawMark {
    fn from(mark: Mark) -> Self {
        let mut attrs = Map::new();
        let mark_type = mark.name().to_string();
        match mark {
            Mark::Highlight { color: Some(color) } => {
                attrs.insert("color".into(), Value::String(color));
            }
            Mark::Link { href } => {
                attrs.insert("href".into(), Value::String(href));
            }
            Mark::TextColor { color } => {
                attrs.insert("color".into(), Value::String(color));
            }
            _ => {}
        }
        RawMark { mark_type, attrs }
    }
}

// =============================================================================
// Nodes
// =============================================================================

fn parse_created_at(value: Option<Value>) -> Option<DateTime<Utc>> {
    match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn parse_kind(node_type: NodeType, attrs: &mut Map<String, Value>) -> NodeKind {
    match node_type {
        NodeType::Heading => NodeKind::Heading {
            level: take_u64(attrs, "level").map(|l| l.clamp(1, 6) as u8).unwrap_or(1),
        },
        NodeType::OrderedList => NodeKind::OrderedList {
            start: take_u64(attrs, "start").map(|s| s as u32).unwrap_or(1),
        },
        NodeType::TaskItem => NodeKind::TaskItem {
            checked: attrs.remove("checked").and_then(|v| v.as_bool()).unwrap_or(false),
        },
        NodeType::TableCell | NodeType::TableHeader => {
            let cell = CellAttrs {
                colspan: take_u64(attrs, "colspan").map(|v| v as u32).unwrap_or(1),
                rowspan: take_u64(attrs, "rowspan").map(|v| v as u32).unwrap_or(1),
            };
            if node_type == NodeType::TableCell {
                NodeKind::TableCell(cell)
            } else {
                NodeKind::TableHeader(cell)
            }
        }
        NodeType::CodeBlock => NodeKind::CodeBlock {
            language: take_string(attrs, "language"),
        },
        NodeType::Image => NodeKind::Image(ImageAttrs {
            src: take_string(attrs, "src").unwrap_or_default(),
            alt: take_string(attrs, "alt"),
            title: take_string(attrs, "title"),
        }),
        other => NodeKind::empty(other),
    }
}

impl TryFrom<RawNode> for Node {
    type Error = DocModelError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let node_type = NodeType::from_name(&raw.node_type)
            .ok_or_else(|| DocModelError::UnknownNodeType(raw.node_type.clone()))?;

        if node_type == NodeType::Text {
            let text = raw.text.ok_or_else(|| {
                DocModelError::MalformedNode("text node without text".to_string())
            })?;
            let marks = raw
                .marks
                .unwrap_or_default()
                .into_iter()
                .map(Mark::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Node::new(
                NodeKind::Text(TextRun::with_marks(text, marks)),
                Vec::new(),
            ));
        }

        let mut attrs = raw.attrs;
        let kind = parse_kind(node_type, &mut attrs);
        let block_attrs = if node_type.is_block() {
            let id = match attrs.remove(ATTR_ID) {
                Some(Value::String(s)) if !s.is_empty() => Some(BlockId::from(s)),
                _ => None,
            };
            let created_at = parse_created_at(attrs.remove(ATTR_CREATED_AT));
            BlockAttrs {
                id,
                created_at,
                extra: attrs,
            }
        } else {
            BlockAttrs::default()
        };

        let content = raw
            .content
            .unwrap_or_default()
            .into_iter()
            .map(Node::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        if node_type.is_atom() && !content.is_empty() {
            return Err(DocModelError::MalformedNode(format!(
                "{} cannot have content",
                node_type
            )));
        }

        Ok(Node {
            kind,
            attrs: block_attrs,
            content,
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let node_type = node.node_type();
        let mut attrs = Map::new();

        if node_type.is_block() {
            // Identity first so it leads the serialized attrs
            attrs.insert(
                ATTR_ID.into(),
                node.attrs
                    .id
                    .as_ref()
                    .map(|id| Value::String(id.to_string()))
                    .unwrap_or(Value::Null),
            );
            attrs.insert(
                ATTR_CREATED_AT.into(),
                node.attrs
                    .created_at
                    .map(|ts| Value::String(ts.to_rfc3339()))
                    .unwrap_or(Value::Null),
            );
            for (key, value) in node.attrs.extra {
                attrs.insert(key, value);
            }
        }

        let mut text = None;
        let mut marks = None;
        match node.kind {
            NodeKind::Heading { level } => {
                attrs.insert("level".into(), Value::from(level));
            }
            NodeKind::OrderedList { start } => {
                attrs.insert("start".into(), Value::from(start));
            }
            NodeKind::TaskItem { checked } => {
                attrs.insert("checked".into(), Value::Bool(checked));
            }
            NodeKind::TableCell(cell) | NodeKind::TableHeader(cell) => {
                attrs.insert("colspan".into(), Value::from(cell.colspan));
                attrs.insert("rowspan".into(), Value::from(cell.rowspan));
            }
            NodeKind::CodeBlock { language } => {
                attrs.insert(
                    "language".into(),
                    language.map(Value::String).unwrap_or(Value::Null),
                );
            }
            NodeKind::Image(image) => {
                attrs.insert("src".into(), Value::String(image.src));
                if let Some(alt) = image.alt {
                    attrs.insert("alt".into(), Value::String(alt));
                }
                if let Some(title) = image.title {
                    attrs.insert("title".into(), Value::String(title));
                }
            }
            NodeKind::Text(run) => {
                text = Some(run.text);
                if !run.marks.is_empty() {
                    marks = Some(run.marks.into_iter().map(RawMark::from).collect());
                }
            }
            _ => {}
        }

        let content = if node_type.is_atom() || node_type == NodeType::Text || node.content.is_empty() {
            None
        } else {
            Some(node.content.into_iter().map(RawNode::from).collect())
        };

        RawNode {
            node_type: node_type.name().to_string(),
            attrs,
            content,
            marks,
            text,
        }
    }
}
