use std::fmt;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A decoded database cell.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(Value),
}

impl DbValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(Value::Null))
    }

    /// Returns the text content for text-like cells.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) | Self::Json(Value::String(value)) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Uuid(value) => write!(f, "{value}"),
            Self::Timestamp(value) => write!(f, "{}", value.format(timestamp_format(value, false))),
            Self::TimestampTz(value) => write!(f, "{}", value.format(timestamp_format(value, true))),
            Self::Text(value) | Self::Json(Value::String(value)) => f.write_str(value),
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

/// Seconds precision when the fraction is zero, otherwise microseconds.
fn timestamp_format(value: &impl Timelike, zoned: bool) -> &'static str {
    match (value.nanosecond() == 0, zoned) {
        (true, false) => "%Y-%m-%d %H:%M:%S",
        (false, false) => "%Y-%m-%d %H:%M:%S%.6f",
        (true, true) => "%Y-%m-%d %H:%M:%S%:z",
        (false, true) => "%Y-%m-%d %H:%M:%S%.6f%:z",
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for DbValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<NaiveDateTime> for DbValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One result row: ordered column/value pairs with lookup by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, DbValue)>,
}

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<DbValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Sets a column value, replacing any existing value for that column.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<DbValue>) {
        let column = column.into();
        let value = value.into();
        if let Some(slot) = self.columns.iter_mut().find(|(name, _)| *name == column) {
            slot.1 = value;
        } else {
            self.columns.push((column, value));
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&DbValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, DbValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, DbValue)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

/// A row restricted to a column projection, ready for JSON output.
pub type NormalizedRow = Map<String, Value>;

/// Normalized rows returned by one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRows {
    pub source: String,
    pub rows: Vec<NormalizedRow>,
}

/// Per-source results, serialized as a map keyed by source in query order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceResults {
    sources: Vec<SourceRows>,
}

impl SourceResults {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn push(&mut self, source: impl Into<String>, rows: Vec<NormalizedRow>) {
        self.sources.push(SourceRows {
            source: source.into(),
            rows,
        });
    }

    #[must_use]
    pub fn get(&self, source: &str) -> Option<&[NormalizedRow]> {
        self.sources
            .iter()
            .find(|entry| entry.source == source)
            .map(|entry| entry.rows.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceRows> {
        self.sources.iter()
    }
}

impl Serialize for SourceResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sources.len()))?;
        for entry in &self.sources {
            map.serialize_entry(&entry.source, &entry.rows)?;
        }
        map.end()
    }
}

/// Response shape shared by every search tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEnvelope<R> {
    pub summary: String,
    pub keyword: String,
    pub results: R,
}

impl<R: Serialize> SearchEnvelope<R> {
    /// Renders the envelope as 2-space indented JSON with non-ASCII text kept literal.
    ///
    /// # Errors
    /// Returns `serde_json::Error` if a result value fails to serialize.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A matched node entry that knows which list it is reported under.
pub trait NodeMatch: Serialize {
    /// Field name holding the matches inside a workflow entry.
    const LIST_FIELD: &'static str;
}

/// A tool node whose provider or tool name matched the keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolNodeMatch {
    pub node_id: String,
    pub node_title: String,
    pub provider_id: String,
    pub tool_name: String,
}

impl NodeMatch for ToolNodeMatch {
    const LIST_FIELD: &'static str = "matching_tools";
}

/// An LLM node whose model name or provider matched the keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LlmNodeMatch {
    pub node_id: String,
    pub node_title: String,
    pub model: String,
    pub provider: String,
}

impl NodeMatch for LlmNodeMatch {
    const LIST_FIELD: &'static str = "matching_llms";
}

/// A workflow (latest version of an app) with at least one matching node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowMatch<M> {
    pub app_id: String,
    pub app_name: String,
    pub matches: Vec<M>,
    pub updated_at: Option<String>,
}

impl<M: NodeMatch> Serialize for WorkflowMatch<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("WorkflowMatch", 4)?;
        state.serialize_field("app_id", &self.app_id)?;
        state.serialize_field("app_name", &self.app_name)?;
        state.serialize_field(M::LIST_FIELD, &self.matches)?;
        state.serialize_field("updated_at", &self.updated_at)?;
        state.end()
    }
}
