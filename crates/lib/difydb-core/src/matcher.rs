//! Keyword matching over workflow graph nodes.

use difydb_store::graph::{GraphDocument, GraphNode, NodeKind};
use difydb_store::schema::{NODE_TYPE_LLM, NODE_TYPE_TOOL};
use difydb_store::{LlmNodeMatch, NodeMatch, ToolNodeMatch};

/// Case-insensitive substring matcher; the keyword is lower-cased once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatcher {
    needle: String,
}

impl KeywordMatcher {
    #[must_use]
    pub fn new(keyword: &str) -> Self {
        Self {
            needle: keyword.to_lowercase(),
        }
    }

    #[must_use]
    pub fn matches(&self, field: &str) -> bool {
        field.to_lowercase().contains(&self.needle)
    }

    #[must_use]
    pub fn matches_any(&self, fields: &[&str]) -> bool {
        fields.iter().any(|field| self.matches(field))
    }
}

/// A node kind the matcher can search for.
pub trait NodeTarget {
    /// Discriminator value in `data.type`.
    const TYPE_NAME: &'static str;
    type Match: NodeMatch;

    fn match_node(node: &GraphNode, keyword: &KeywordMatcher) -> Option<Self::Match>;
}

/// Tool nodes, matched on `provider_id` or `tool_name`.
#[derive(Debug, Clone, Copy)]
pub struct ToolNodes;

impl NodeTarget for ToolNodes {
    const TYPE_NAME: &'static str = NODE_TYPE_TOOL;
    type Match = ToolNodeMatch;

    fn match_node(node: &GraphNode, keyword: &KeywordMatcher) -> Option<Self::Match> {
        let NodeKind::Tool(tool) = &node.kind else {
            return None;
        };
        keyword
            .matches_any(&[tool.provider_id.as_str(), tool.tool_name.as_str()])
            .then(|| ToolNodeMatch {
                node_id: node.id.clone(),
                node_title: node.title.clone(),
                provider_id: tool.provider_id.clone(),
                tool_name: tool.tool_name.clone(),
            })
    }
}

/// LLM nodes, matched on resolved model name or provider.
#[derive(Debug, Clone, Copy)]
pub struct LlmNodes;

impl NodeTarget for LlmNodes {
    const TYPE_NAME: &'static str = NODE_TYPE_LLM;
    type Match = LlmNodeMatch;

    fn match_node(node: &GraphNode, keyword: &KeywordMatcher) -> Option<Self::Match> {
        let NodeKind::Llm(llm) = &node.kind else {
            return None;
        };
        keyword
            .matches_any(&[llm.model.as_str(), llm.provider.as_str()])
            .then(|| LlmNodeMatch {
                node_id: node.id.clone(),
                node_title: node.title.clone(),
                model: llm.model.clone(),
                provider: llm.provider.clone(),
            })
    }
}

/// Returns matching nodes of kind `T` in document order.
#[must_use]
pub fn match_nodes<T: NodeTarget>(document: &GraphDocument, keyword: &KeywordMatcher) -> Vec<T::Match> {
    document
        .nodes_of_type(T::TYPE_NAME)
        .filter_map(|node| T::match_node(node, keyword))
        .collect()
}
