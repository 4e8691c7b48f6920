//! Incoming questions and their validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::ValidationError;

/// Raw `POST /query` body.
///
/// Fields stay untyped so validation can report one precise message per
/// field instead of a generic deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<Value>,

    /// Accepted alias for `question`.
    #[serde(default)]
    pub query: Option<Value>,

    #[serde(default)]
    pub community_level: Option<Value>,

    #[serde(default)]
    pub dynamic: Option<Value>,
}

impl QueryRequest {
    /// Parse a request body, mapping any JSON error to a validation failure.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
        match value {
            Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| ValidationError::InvalidJson(e.to_string())),
            Value::Null => Ok(Self::default()),
            _ => Err(ValidationError::MissingQuestion),
        }
    }
}

/// A validated question plus the optional engine knobs a caller may set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    /// Trimmed, non-empty question text.
    pub question: String,

    /// Fixed community level cap for the engine.
    pub community_level: Option<u32>,

    /// Whether the engine should pick communities dynamically.
    pub dynamic_community_selection: bool,
}

impl Query {
    /// Build a query from free text. Fails on empty or whitespace-only input.
    pub fn new(question: impl AsRef<str>) -> Result<Self, ValidationError> {
        let question = question.as_ref().trim();
        if question.is_empty() {
            return Err(ValidationError::MissingQuestion);
        }
        Ok(Self {
            question: question.to_string(),
            community_level: None,
            dynamic_community_selection: true,
        })
    }

    pub fn with_community_level(mut self, level: u32) -> Self {
        self.community_level = Some(level);
        self
    }

    pub fn with_dynamic_selection(mut self, dynamic: bool) -> Self {
        self.dynamic_community_selection = dynamic;
        self
    }
}

impl TryFrom<QueryRequest> for Query {
    type Error = ValidationError;

    fn try_from(req: QueryRequest) -> Result<Self, Self::Error> {
        let question = non_empty_str(req.question.as_ref())
            .or_else(|| non_empty_str(req.query.as_ref()))
            .ok_or(ValidationError::MissingQuestion)?;

        let mut query = Query::new(question)?;
        if let Some(level) = parse_community_level(req.community_level.as_ref())? {
            query = query.with_community_level(level);
        }
        query = query.with_dynamic_selection(parse_dynamic(req.dynamic.as_ref())?);
        Ok(query)
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn parse_community_level(value: Option<&Value>) -> Result<Option<u32>, ValidationError> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
                .map(|f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    parsed
        .and_then(|n| u32::try_from(n).ok())
        .map(Some)
        .ok_or(ValidationError::InvalidCommunityLevel)
}

fn parse_dynamic(value: Option<&Value>) -> Result<bool, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(true),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => Ok(!matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "no"
        )),
        Some(Value::Number(n)) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(true)),
        Some(_) => Err(ValidationError::InvalidDynamic),
    }
}
