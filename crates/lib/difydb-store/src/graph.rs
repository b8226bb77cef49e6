//! Typed model of a Dify workflow graph document.
//!
//! Workflow graphs are stored as free-form JSON text. Nodes are decoded once
//! into [`NodeKind`] variants with every missing or oddly shaped field filled
//! with an empty string, so matching code never has to guard against absent
//! keys.

use std::{error::Error, fmt};

use serde_json::{Map, Value};

use crate::schema::{NODE_TYPE_LLM, NODE_TYPE_TOOL};

#[derive(Debug)]
pub enum GraphParseError {
    Empty,
    InvalidJson(serde_json::Error),
    NotAnObject,
}

impl fmt::Display for GraphParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "graph is empty"),
            Self::InvalidJson(err) => write!(f, "graph is not valid JSON: {err}"),
            Self::NotAnObject => write!(f, "graph root is not a JSON object"),
        }
    }
}

impl Error for GraphParseError {}

impl From<serde_json::Error> for GraphParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err)
    }
}

/// Fields of a `tool` node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolNode {
    pub provider_id: String,
    pub tool_name: String,
}

/// Fields of an `llm` node after resolving the nested or flat model shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmNode {
    pub model: String,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Tool(ToolNode),
    Llm(LlmNode),
    /// Any other node type, keeping its discriminator.
    Other(String),
}

impl NodeKind {
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Tool(_) => NODE_TYPE_TOOL,
            Self::Llm(_) => NODE_TYPE_LLM,
            Self::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    pub kind: NodeKind,
}

impl GraphNode {
    /// Decodes a node entry. Returns `None` when the entry is not an object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let node = value.as_object()?;
        let empty = Map::new();
        let data = node.get("data").and_then(Value::as_object).unwrap_or(&empty);

        let kind = match text_field(data, "type").as_str() {
            NODE_TYPE_TOOL => NodeKind::Tool(ToolNode {
                provider_id: text_field(data, "provider_id"),
                tool_name: text_field(data, "tool_name"),
            }),
            NODE_TYPE_LLM => NodeKind::Llm(decode_llm(data)),
            other => NodeKind::Other(other.to_string()),
        };

        Some(Self {
            id: text_field(node, "id"),
            title: text_field(data, "title"),
            kind,
        })
    }
}

/// A parsed workflow graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,
}

impl GraphDocument {
    /// Parses a serialized graph.
    ///
    /// # Errors
    /// Returns `GraphParseError` when the text is blank, is not JSON, or its
    /// root is not an object.
    pub fn parse(raw: &str) -> Result<Self, GraphParseError> {
        if raw.trim().is_empty() {
            return Err(GraphParseError::Empty);
        }
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    /// Builds a document from an already decoded JSON value.
    ///
    /// # Errors
    /// Returns `GraphParseError::NotAnObject` when the root is not an object.
    pub fn from_value(value: &Value) -> Result<Self, GraphParseError> {
        let root = value.as_object().ok_or(GraphParseError::NotAnObject)?;
        let nodes = root
            .get("nodes")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().filter_map(GraphNode::from_value).collect())
            .unwrap_or_default();
        Ok(Self { nodes })
    }

    /// Iterates nodes whose discriminator equals `type_name`, in document order.
    pub fn nodes_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a GraphNode> {
        self.nodes
            .iter()
            .filter(move |node| node.kind.type_name() == type_name)
    }
}

fn decode_llm(data: &Map<String, Value>) -> LlmNode {
    match data.get("model") {
        Some(Value::Object(model)) => LlmNode {
            model: text_field(model, "name"),
            provider: text_field(model, "provider"),
        },
        other => LlmNode {
            model: other.map(value_text).unwrap_or_default(),
            provider: text_field(data, "provider"),
        },
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).map(value_text).unwrap_or_default()
}

/// Renders a JSON value as plain text; null becomes empty.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tool_and_llm_nodes() {
        let doc = GraphDocument::parse(
            r#"{"nodes":[
                {"id":"n1","data":{"type":"tool","provider_id":"google_search","tool_name":"search","title":"Search"}},
                {"id":"n2","data":{"type":"llm","model":{"name":"claude-3","provider":"anthropic"},"title":"LLM"}},
                {"id":"n3","data":{"type":"start","title":"Start"}}
            ]}"#,
        )
        .expect("graph should parse");

        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(
            doc.nodes[0].kind,
            NodeKind::Tool(ToolNode {
                provider_id: "google_search".to_string(),
                tool_name: "search".to_string(),
            })
        );
        assert_eq!(doc.nodes[0].title, "Search");
        assert_eq!(
            doc.nodes[1].kind,
            NodeKind::Llm(LlmNode {
                model: "claude-3".to_string(),
                provider: "anthropic".to_string(),
            })
        );
        assert_eq!(doc.nodes[2].kind, NodeKind::Other("start".to_string()));
    }

    #[test]
    fn llm_falls_back_to_flat_fields() {
        let doc = GraphDocument::parse(
            r#"{"nodes":[{"id":"n1","data":{"type":"llm","model":"gpt-4","provider":"openai"}}]}"#,
        )
        .expect("graph should parse");
        assert_eq!(
            doc.nodes[0].kind,
            NodeKind::Llm(LlmNode {
                model: "gpt-4".to_string(),
                provider: "openai".to_string(),
            })
        );
    }

    #[test]
    fn missing_fields_degrade_to_empty_strings() {
        let doc = GraphDocument::parse(
            r#"{"nodes":[{"data":{"type":"tool","provider_id":null}},{"data":{"type":"llm"}},{"id":7}]}"#,
        )
        .expect("graph should parse");
        assert_eq!(doc.nodes[0].id, "");
        assert_eq!(doc.nodes[0].kind, NodeKind::Tool(ToolNode::default()));
        assert_eq!(doc.nodes[1].kind, NodeKind::Llm(LlmNode::default()));
        assert_eq!(doc.nodes[2].id, "7");
        assert_eq!(doc.nodes[2].kind, NodeKind::Other(String::new()));
    }

    #[test]
    fn skips_non_object_nodes_and_tolerates_missing_list() {
        let doc = GraphDocument::parse(r#"{"nodes":[1,"x",{"id":"a","data":{"type":"tool"}}]}"#)
            .expect("graph should parse");
        assert_eq!(doc.nodes.len(), 1);

        let empty = GraphDocument::parse(r#"{"edges":[]}"#).expect("graph should parse");
        assert!(empty.nodes.is_empty());

        let wrong_shape = GraphDocument::parse(r#"{"nodes":{"a":1}}"#).expect("graph should parse");
        assert!(wrong_shape.nodes.is_empty());
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(GraphDocument::parse(""), Err(GraphParseError::Empty)));
        assert!(matches!(
            GraphDocument::parse(r#"{"nodes":[{"id":"n1""#),
            Err(GraphParseError::InvalidJson(_))
        ));
        assert!(matches!(
            GraphDocument::parse("[1,2]"),
            Err(GraphParseError::NotAnObject)
        ));
    }

    #[test]
    fn filters_nodes_by_type_in_order() {
        let doc = GraphDocument::parse(
            r#"{"nodes":[
                {"id":"a","data":{"type":"tool"}},
                {"id":"b","data":{"type":"llm"}},
                {"id":"c","data":{"type":"tool"}}
            ]}"#,
        )
        .expect("graph should parse");
        let ids: Vec<_> = doc.nodes_of_type(NODE_TYPE_TOOL).map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(doc.nodes_of_type("code").count(), 0);
    }
}
