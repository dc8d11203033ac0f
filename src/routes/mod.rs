pub mod dissociate;
pub mod docs;
pub mod locations;
pub mod system;
pub mod terms;

use aide::axum::{routing::get_with, ApiRouter};
use axum::extract::rejection::QueryRejection;
use axum::{http::StatusCode, Json};
use schemars::JsonSchema;
use serde::Serialize;

use crate::error::ServiceError;
use crate::studies::data::StudyMetadata;
use crate::studies::plan::{QueryMode, QueryPlan};
use crate::AppState;

pub(crate) fn studies_routes() -> ApiRouter<AppState> {
    ApiRouter::new()
        .api_route(
            "/terms/{term}/studies",
            get_with(terms::term_studies, terms::term_studies_docs),
        )
        .api_route(
            "/locations/{coords}/studies",
            get_with(locations::location_studies, locations::location_studies_docs),
        )
}

#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct StudiesResponse {
    pub ok: bool,
    pub mode: QueryMode,
    pub params: QueryPlan,
    /// Number of matching studies before truncation.
    pub count: usize,
    /// Whether `study_ids` was cut down to the display cap.
    pub truncated: bool,
    pub study_ids: Vec<i64>,
    pub sample_metadata: Vec<StudyMetadata>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(untagged)]
pub(crate) enum Response {
    Studies(StudiesResponse),
    Error(ErrorResponse),
}

/// Runs `plan` against the store and shapes the result for display.
pub(crate) async fn run(
    state: &AppState,
    plan: QueryPlan,
) -> Result<StudiesResponse, ServiceError> {
    let set = state
        .store
        .studies(&plan, state.limits.sample_size)
        .await?;

    let count = set.study_ids.len();
    let mut study_ids = set.study_ids;
    let truncated = count > state.limits.display_cap;
    study_ids.truncate(state.limits.display_cap);
    tracing::debug!("{:?} matched {} studies", plan.mode(), count);

    Ok(StudiesResponse {
        ok: true,
        mode: plan.mode(),
        params: plan,
        count,
        truncated,
        study_ids,
        sample_metadata: set.sample_metadata,
    })
}

pub(crate) fn respond(
    result: Result<StudiesResponse, ServiceError>,
) -> (StatusCode, Json<Response>) {
    match result {
        Ok(response) => (StatusCode::OK, Json(Response::Studies(response))),
        Err(error) => (
            error.status(),
            Json(Response::Error(ErrorResponse {
                ok: false,
                error: error.to_string(),
            })),
        ),
    }
}

pub(crate) fn invalid_query(rejection: QueryRejection) -> ServiceError {
    ServiceError::InvalidInput(rejection.body_text())
}
