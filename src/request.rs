//! Request snapshots for the audit log
//!
//! `request_to_dict` flattens anything implementing [`RequestSource`] into a
//! [`RequestSnapshot`]. Capture never fails: a field whose structured form
//! cannot be read is stored as its raw string instead, and metadata falls
//! back to a stringified copy in `RAW_METADATA`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::AuditError;
use crate::sanitize::{filter_request_meta, fix_dict, EnvSnapshot};

/// Parsed query, form or cookie parameters
pub type Params = BTreeMap<String, String>;

/// Structured request metadata (CGI-style keys)
pub type Metadata = BTreeMap<String, Value>;

/// Capabilities a request must expose to be captured
///
/// Each structured accessor may fail; its `raw_*` counterpart must not.
pub trait RequestSource {
    fn path(&self) -> String;

    fn get_params(&self) -> Result<Params, AuditError>;
    fn raw_get(&self) -> String;

    fn post_params(&self) -> Result<Params, AuditError>;
    fn raw_post(&self) -> String;

    fn cookies(&self) -> Result<Params, AuditError>;
    fn raw_cookies(&self) -> String;

    fn metadata(&self) -> Result<Metadata, AuditError>;
    fn raw_metadata(&self) -> BTreeMap<String, String>;
}

/// A request field that is either parsed or kept as its raw text
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CapturedField {
    Parsed(Params),
    Raw(String),
}

impl CapturedField {
    pub fn is_raw(&self) -> bool {
        matches!(self, CapturedField::Raw(_))
    }

    pub fn as_params(&self) -> Option<&Params> {
        match self {
            CapturedField::Parsed(params) => Some(params),
            CapturedField::Raw(_) => None,
        }
    }

    /// Number of parsed entries, 0 for raw fields
    pub fn len(&self) -> usize {
        self.as_params().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flattened, sanitized view of one HTTP request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestSnapshot {
    pub path: String,

    #[serde(rename = "GET")]
    pub get: CapturedField,

    #[serde(rename = "POST")]
    pub post: CapturedField,

    #[serde(rename = "COOKIES")]
    pub cookies: CapturedField,

    /// Filtered and sanitized metadata, `None` when capture failed
    #[serde(rename = "METADATA")]
    pub metadata: Option<Metadata>,

    /// Stringified filtered metadata, only set when `metadata` is `None`
    #[serde(rename = "RAW_METADATA")]
    pub raw_metadata: Option<String>,
}

/// Capture a request into a snapshot, degrading field by field
pub fn request_to_dict<R>(request: &R, env: &EnvSnapshot) -> RequestSnapshot
where
    R: RequestSource + ?Sized,
{
    let path = request.path();

    let get = capture_field("GET", request.get_params(), || request.raw_get());
    let post = capture_field("POST", request.post_params(), || request.raw_post());
    let cookies = capture_field("COOKIES", request.cookies(), || request.raw_cookies());

    let (metadata, raw_metadata) = match capture_metadata(request, env) {
        Ok(metadata) => (Some(metadata), None),
        Err(e) => {
            warn!(path = %path, error = %e, "storing raw request metadata");
            let filtered = filter_request_meta(request.raw_metadata(), env);
            (None, Some(stringify_request_meta(&filtered)))
        }
    };

    RequestSnapshot {
        path,
        get,
        post,
        cookies,
        metadata,
        raw_metadata,
    }
}

fn capture_field(
    name: &str,
    parsed: Result<Params, AuditError>,
    raw: impl FnOnce() -> String,
) -> CapturedField {
    match parsed {
        Ok(params) => CapturedField::Parsed(fix_dict(params)),
        Err(e) => {
            warn!(field = name, error = %e, "storing raw request field");
            CapturedField::Raw(raw())
        }
    }
}

fn capture_metadata<R>(request: &R, env: &EnvSnapshot) -> Result<Metadata, AuditError>
where
    R: RequestSource + ?Sized,
{
    let metadata = request.metadata()?;
    Ok(fix_dict(filter_request_meta(metadata, env)))
}

/// Render metadata as a literal that `parse_request_meta` reads back
pub fn stringify_request_meta(metadata: &BTreeMap<String, String>) -> String {
    // A string-to-string map always serializes; Debug output is a last resort
    serde_json::to_string(metadata).unwrap_or_else(|_| format!("{:?}", metadata))
}

/// Parse stringified metadata back into a mapping
pub fn parse_request_meta(raw: &str) -> Result<Metadata, AuditError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| AuditError::Parse(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(AuditError::Parse(format!(
            "expected a mapping, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
