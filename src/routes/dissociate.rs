use aide::axum::{routing::get_with, ApiRouter, IntoApiResponse};
use aide::transform::TransformOperation;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{invalid_query, respond, run, ErrorResponse, StudiesResponse};
use crate::error::ServiceError;
use crate::studies::coordinate::Coordinate;
use crate::studies::plan::{resolve_limit, Membership, QueryPlan, TermMatch};
use crate::studies::term::Term;
use crate::AppState;

pub(crate) fn dissociate_routes(state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/terms/{term_a}/{term_b}",
            get_with(dissociate_terms, dissociate_terms_docs),
        )
        .api_route(
            "/locations/{coords_a}/{coords_b}",
            get_with(dissociate_locations, dissociate_locations_docs),
        )
        .with_state(state)
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct TermPairPath {
    /// Term the studies must match.
    pub term_a: String,
    /// Term the studies must not match.
    pub term_b: String,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct DissociateTermsParams {
    /// Weight threshold for both terms. Defaults to 0.
    pub minw: Option<f64>,
    /// Weight threshold for `term_a`, overrides `minw`.
    pub minw_a: Option<f64>,
    /// Weight threshold for `term_b`, overrides `minw`.
    pub minw_b: Option<f64>,
    /// Maximum number of studies to return, capped by the server.
    pub limit: Option<u32>,
    /// `exact` matches annotation terms, `title` matches substrings of study titles.
    #[serde(default, rename = "match")]
    pub matching: TermMatch,
}

pub(crate) async fn dissociate_terms(
    State(state): State<AppState>,
    Path(path): Path<TermPairPath>,
    params: Result<Query<DissociateTermsParams>, QueryRejection>,
) -> impl IntoApiResponse {
    respond(dissociate_terms_inner(&state, &path, params).await)
}

async fn dissociate_terms_inner(
    state: &AppState,
    path: &TermPairPath,
    params: Result<Query<DissociateTermsParams>, QueryRejection>,
) -> Result<StudiesResponse, ServiceError> {
    let Query(params) = params.map_err(invalid_query)?;

    let include = Membership::term(
        Term::normalize(&path.term_a)?,
        params.matching,
        params.minw_a.or(params.minw),
    )?;
    let exclude = Membership::term(
        Term::normalize(&path.term_b)?,
        params.matching,
        params.minw_b.or(params.minw),
    )?;
    let limit = resolve_limit(params.limit, &state.limits)?;

    run(state, QueryPlan::dissociate(include, exclude, limit)).await
}

pub(crate) fn dissociate_terms_docs(op: TransformOperation) -> TransformOperation {
    op.description("Find all studies that match `term_a` but not `term_b`.")
        .response::<200, Json<StudiesResponse>>()
        .response_with::<400, Json<ErrorResponse>, _>(|t| {
            t.description("A term was empty or a parameter was malformed.")
        })
        .response_with::<500, Json<ErrorResponse>, _>(|t| {
            t.description("The database query failed.")
        })
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct CoordinatePairPath {
    /// Coordinate (`x_y_z`) the studies must report near.
    pub coords_a: String,
    /// Coordinate (`x_y_z`) the studies must not report near.
    pub coords_b: String,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct DissociateLocationsParams {
    /// Radius around both coordinates. Defaults to 2.
    pub radius: Option<f64>,
    /// Radius around `coords_a`, overrides `radius`.
    pub r_in: Option<f64>,
    /// Radius around `coords_b`, overrides `radius`.
    pub r_out: Option<f64>,
    /// Maximum number of studies to return, capped by the server.
    pub limit: Option<u32>,
}

pub(crate) async fn dissociate_locations(
    State(state): State<AppState>,
    Path(path): Path<CoordinatePairPath>,
    params: Result<Query<DissociateLocationsParams>, QueryRejection>,
) -> impl IntoApiResponse {
    respond(dissociate_locations_inner(&state, &path, params).await)
}

async fn dissociate_locations_inner(
    state: &AppState,
    path: &CoordinatePairPath,
    params: Result<Query<DissociateLocationsParams>, QueryRejection>,
) -> Result<StudiesResponse, ServiceError> {
    let Query(params) = params.map_err(invalid_query)?;

    let point_a: Coordinate = path.coords_a.parse()?;
    let point_b: Coordinate = path.coords_b.parse()?;
    let include = Membership::location(point_a, params.r_in.or(params.radius))?;
    let exclude = Membership::location(point_b, params.r_out.or(params.radius))?;
    let limit = resolve_limit(params.limit, &state.limits)?;

    run(state, QueryPlan::dissociate(include, exclude, limit)).await
}

pub(crate) fn dissociate_locations_docs(op: TransformOperation) -> TransformOperation {
    op.description(
        "Find all studies reporting a coordinate near `coords_a` but none near `coords_b`.",
    )
        .response::<200, Json<StudiesResponse>>()
        .response_with::<400, Json<ErrorResponse>, _>(|t| {
            t.description("A coordinate or a parameter was malformed.")
        })
        .response_with::<500, Json<ErrorResponse>, _>(|t| {
            t.description("The database query failed.")
        })
}
