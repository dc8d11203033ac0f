pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;

use crate::error::ServiceError;
use crate::studies::data::StudySet;
use crate::studies::plan::QueryPlan;

/// Read-only access to the meta-analysis tables.
#[async_trait]
pub trait StudyStore: Send + Sync {
    fn dialect(&self) -> &'static str;

    /// Runs `plan` and, for a non-empty result, fetches up to `sample_size`
    /// metadata rows for the leading ids.
    async fn studies(&self, plan: &QueryPlan, sample_size: u32) -> Result<StudySet, ServiceError>;

    /// Fills `report` with connectivity details. Fields collected before a
    /// failure stay populated.
    async fn diagnostics(&self, report: &mut DbReport) -> Result<(), ServiceError>;

    async fn close(&self) {}
}

/// Payload of the `/test_db` endpoint.
#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct DbReport {
    pub ok: bool,
    pub dialect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations_terms_count: Option<i64>,
    pub coordinates_sample: Vec<serde_json::Value>,
    pub metadata_sample: Vec<serde_json::Value>,
    pub annotations_terms_sample: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DbReport {
    pub fn new(dialect: &str) -> Self {
        DbReport {
            dialect: dialect.to_string(),
            ..Default::default()
        }
    }
}
