use aide::axum::IntoApiResponse;
use aide::transform::TransformOperation;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{invalid_query, respond, run, ErrorResponse, StudiesResponse};
use crate::error::ServiceError;
use crate::studies::plan::{resolve_limit, Membership, QueryPlan, TermMatch};
use crate::studies::term::Term;
use crate::AppState;

#[derive(Deserialize, JsonSchema)]
pub(crate) struct TermPath {
    /// Annotation term, words joined by underscores (e.g. `posterior_cingulate`).
    pub term: String,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct TermStudiesParams {
    /// Studies must be annotated with a weight strictly above this value. Defaults to 0.
    pub minw: Option<f64>,
    /// Maximum number of studies to return, capped by the server.
    pub limit: Option<u32>,
    /// `exact` matches annotation terms, `title` matches substrings of study titles.
    #[serde(default, rename = "match")]
    pub matching: TermMatch,
}

pub(crate) async fn term_studies(
    State(state): State<AppState>,
    Path(path): Path<TermPath>,
    params: Result<Query<TermStudiesParams>, QueryRejection>,
) -> impl IntoApiResponse {
    respond(term_studies_inner(&state, &path.term, params).await)
}

async fn term_studies_inner(
    state: &AppState,
    raw_term: &str,
    params: Result<Query<TermStudiesParams>, QueryRejection>,
) -> Result<StudiesResponse, ServiceError> {
    let Query(params) = params.map_err(invalid_query)?;

    let include = Membership::term(Term::normalize(raw_term)?, params.matching, params.minw)?;
    let limit = resolve_limit(params.limit, &state.limits)?;

    run(state, QueryPlan::lookup(include, limit)).await
}

pub(crate) fn term_studies_docs(op: TransformOperation) -> TransformOperation {
    op.description(
        "Find all studies annotated with the term above the weight threshold, \
         or whose title contains the term.",
    )
        .response::<200, Json<StudiesResponse>>()
        .response_with::<400, Json<ErrorResponse>, _>(|t| {
            t.description("The term was empty or a parameter was malformed.")
        })
        .response_with::<500, Json<ErrorResponse>, _>(|t| {
            t.description("The database query failed.")
        })
}
