use std::fmt;

use schemars::JsonSchema;
use serde::Serialize;

use crate::error::ServiceError;

/// A normalized annotation term: underscores become spaces, surrounding
/// whitespace is stripped and the text is lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct Term(String);

impl Term {
    pub fn normalize(raw: &str) -> Result<Self, ServiceError> {
        let normalized = raw.replace('_', " ").trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ServiceError::InvalidInput(format!(
                "term '{}' is empty after normalization",
                raw
            )));
        }
        Ok(Term(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
