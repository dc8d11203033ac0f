use schemars::JsonSchema;
use serde::Serialize;

/// Display metadata for one study.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema, sqlx::FromRow)]
pub struct StudyMetadata {
    pub study_id: i64,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub year: Option<i64>,
}

/// Ordered, deduplicated study ids plus a best-effort metadata sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudySet {
    pub study_ids: Vec<i64>,
    pub sample_metadata: Vec<StudyMetadata>,
}
