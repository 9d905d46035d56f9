//! Result decoding for the query-service envelope.
//!
//! The envelope's identity fields (`queryId`, `status`, `message`, `data`)
//! decode as a unit: if any of them has the wrong JSON type, or the body is
//! not JSON at all, the page is all-empty. Its empty status is then rejected
//! by the controller instead of being misread. The `columns` and `rows`
//! payloads decode leniently: a malformed columns list yields zero columns, a
//! malformed rows list yields zero rows, and a malformed individual row
//! becomes an empty row in its position.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Remote status value for a query that is still executing.
pub const STATUS_RUNNING: &str = "Running";

/// Remote status value for a query whose current page is ready.
pub const STATUS_FINISHED: &str = "Finished";

/// A single value from a result row.
///
/// Rows arrive as untyped JSON objects; each scalar is kept in its JSON
/// shape. Arrays and objects are not representable and fail the row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// JSON null.
    #[default]
    Null,

    /// JSON boolean.
    Bool(bool),

    /// JSON number that fits in an i64.
    Int(i64),

    /// Any other JSON number.
    Float(f64),

    /// JSON string.
    String(String),
}

impl Value {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to a display string.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// A result row, keyed by column name in the order the server sent them.
pub type Row = IndexMap<String, Value>;

/// Status reported by the query service for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    /// The query is still executing; poll again.
    Running,
    /// The current page is complete.
    Finished,
    /// Anything else (including a missing status).
    Other(String),
}

impl RemoteStatus {
    /// Parses a status string. Matching is exact.
    pub fn parse(s: &str) -> Self {
        match s {
            STATUS_RUNNING => Self::Running,
            STATUS_FINISHED => Self::Finished,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the status as sent by the server.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => STATUS_RUNNING,
            Self::Finished => STATUS_FINISHED,
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded response from the execute or result endpoint.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultPage {
    /// Server-assigned query identifier.
    pub query_id: String,

    /// Remote status string (`Running`, `Finished`, ...).
    pub status: String,

    /// Server message, surfaced in error text.
    pub message: String,

    /// Whether another page follows this one.
    pub has_next: bool,

    /// Whether a page precedes this one.
    pub has_previous: bool,

    /// Ordered column names.
    pub columns: Vec<String>,

    /// Ordered rows.
    pub rows: Vec<Row>,
}

impl QueryResultPage {
    /// Decodes an envelope. Never fails; see the module docs for the policy.
    pub fn from_json(payload: &str) -> Self {
        let envelope: RawEnvelope = match serde_json::from_str(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Could not decode query result envelope: {}", e);
                return Self::default();
            }
        };

        let data = envelope.data.unwrap_or_default();

        Self {
            query_id: envelope.query_id.unwrap_or_default(),
            status: envelope.status.unwrap_or_default(),
            message: envelope.message.unwrap_or_default(),
            has_next: data.has_next.unwrap_or(false),
            has_previous: data.has_previous.unwrap_or(false),
            columns: data.columns.map(decode_columns).unwrap_or_default(),
            rows: data.rows.map(decode_rows).unwrap_or_default(),
        }
    }

    /// Returns the parsed remote status.
    pub fn remote_status(&self) -> RemoteStatus {
        RemoteStatus::parse(&self.status)
    }

    /// Returns the number of rows on this page.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this page carries no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn decode_columns(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("Could not decode result columns: {}", e);
        Vec::new()
    })
}

fn decode_rows(value: serde_json::Value) -> Vec<Row> {
    let raw_rows: Vec<serde_json::Value> = match serde_json::from_value(value) {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Could not decode result rows: {}", e);
            return Vec::new();
        }
    };

    raw_rows
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            serde_json::from_value(raw).unwrap_or_else(|e| {
                warn!("Could not decode result row {}: {}", index, e);
                Row::new()
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    #[serde(default)]
    query_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<RawData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawData {
    #[serde(default)]
    has_next: Option<bool>,
    #[serde(default)]
    has_previous: Option<bool>,
    #[serde(default)]
    columns: Option<serde_json::Value>,
    #[serde(default)]
    rows: Option<serde_json::Value>,
}
