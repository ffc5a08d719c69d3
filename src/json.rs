//! Conversion between syntax trees and their JSON form.
//!
//! Every node becomes an object `{"type": ..., "content": ..., "location": {"start": ...,
//! "end": ...}}` where `type` is `"atom"`, `"string"` or `"list"`, `content` is text for
//! atoms and strings and an array of nodes for lists, and positions are
//! `{"offset", "line", "column"}` objects.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::MAX_PARSE_DEPTH;
use crate::ast::{Node, NodeKind, Span};

/// Reasons a JSON document is not a valid node sequence.
#[derive(Debug, Error)]
pub enum JsonError {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("expected {expected} at {path}")]
    Shape { expected: &'static str, path: String },

    #[error("unknown node type '{found}' at {path}")]
    UnknownType { found: String, path: String },

    #[error("node tree too deeply nested (max depth: {})", MAX_PARSE_DEPTH)]
    TooDeeplyNested,
}

/// Convert a node sequence to a JSON array
pub fn to_json(nodes: &[Node]) -> Value {
    Value::Array(nodes.iter().map(node_to_json).collect())
}

pub fn to_json_string(nodes: &[Node]) -> String {
    to_json(nodes).to_string()
}

pub fn to_json_string_pretty(nodes: &[Node]) -> Result<String, JsonError> {
    Ok(serde_json::to_string_pretty(&to_json(nodes))?)
}

/// Convert a single node to its JSON object
pub fn node_to_json(node: &Node) -> Value {
    let (kind, content) = match &node.kind {
        NodeKind::Atom(text) => ("atom", Value::String(text.clone())),
        NodeKind::String(text) => ("string", Value::String(text.clone())),
        NodeKind::List(children) => ("list", to_json(children)),
    };
    json!({
        "type": kind,
        "content": content,
        "location": node.span,
    })
}

/// Read a node sequence back from a JSON array
pub fn from_json(json: &Value) -> Result<Vec<Node>, JsonError> {
    nodes_from_json(json, "$", 0)
}

/// Read a node sequence from JSON text. Nesting is bounded by [`MAX_PARSE_DEPTH`] lists
/// rather than by serde_json's own recursion limit, which is too shallow for deep trees.
pub fn from_json_str(input: &str) -> Result<Vec<Node>, JsonError> {
    if json_nesting(input) > MAX_JSON_NESTING {
        return Err(JsonError::TooDeeplyNested);
    }
    let mut deserializer = serde_json::Deserializer::from_str(input);
    deserializer.disable_recursion_limit();
    let json = Value::deserialize(&mut deserializer)?;
    deserializer.end()?;
    from_json(&json)
}

/// Arrays and objects a node tree at the depth limit needs, plus slack for the
/// surrounding array and location objects
const MAX_JSON_NESTING: usize = 2 * MAX_PARSE_DEPTH + 8;

/// Deepest `[`/`{` nesting in a JSON text, ignoring brackets inside strings
fn json_nesting(input: &str) -> usize {
    let (mut depth, mut deepest) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for b in input.bytes() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn nodes_from_json(json: &Value, path: &str, depth: usize) -> Result<Vec<Node>, JsonError> {
    if depth > MAX_PARSE_DEPTH {
        return Err(JsonError::TooDeeplyNested);
    }
    let items = json.as_array().ok_or_else(|| shape("array of nodes", path))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| node_from_json(item, &format!("{path}[{i}]"), depth + 1))
        .collect()
}

fn node_from_json(json: &Value, path: &str, depth: usize) -> Result<Node, JsonError> {
    let object: &Map<String, Value> =
        json.as_object().ok_or_else(|| shape("node object", path))?;

    let location = object
        .get("location")
        .ok_or_else(|| shape("location", path))?;
    let span: Span = Span::deserialize(location)
        .map_err(|_| shape("location with start and end positions", path))?;
    if span.end < span.start {
        return Err(shape("location ending at or after its start", path));
    }

    let content = object
        .get("content")
        .ok_or_else(|| shape("content", path))?;
    let text = || {
        content
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| shape("string content", path))
    };

    let kind = match object.get("type").and_then(Value::as_str) {
        Some("atom") => NodeKind::Atom(text()?),
        Some("string") => NodeKind::String(text()?),
        Some("list") => {
            let path = format!("{path}.content");
            let children = nodes_from_json(content, &path, depth)?;
            if let Some(i) = children.iter().position(|c| !span.encloses(&c.span)) {
                let child_path = format!("{path}[{i}]");
                return Err(shape("list location enclosing its children", &child_path));
            }
            NodeKind::List(children)
        }
        Some(other) => {
            return Err(JsonError::UnknownType {
                found: other.to_owned(),
                path: path.to_owned(),
            });
        }
        None => return Err(shape("node type", path)),
    };
    Ok(Node::new(kind, span))
}

fn shape(expected: &'static str, path: &str) -> JsonError {
    JsonError::Shape {
        expected,
        path: path.to_owned(),
    }
}
