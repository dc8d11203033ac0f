use aide::axum::IntoApiResponse;
use aide::transform::TransformOperation;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{invalid_query, respond, run, ErrorResponse, StudiesResponse};
use crate::error::ServiceError;
use crate::studies::coordinate::Coordinate;
use crate::studies::plan::{resolve_limit, Membership, QueryPlan};
use crate::AppState;

#[derive(Deserialize, JsonSchema)]
pub(crate) struct LocationPath {
    /// Coordinate as `x_y_z`, e.g. `0_-52_26`.
    pub coords: String,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct LocationStudiesParams {
    /// Search radius around the coordinate (inclusive). Defaults to 2.
    pub radius: Option<f64>,
    /// Maximum number of studies to return, capped by the server.
    pub limit: Option<u32>,
}

pub(crate) async fn location_studies(
    State(state): State<AppState>,
    Path(path): Path<LocationPath>,
    params: Result<Query<LocationStudiesParams>, QueryRejection>,
) -> impl IntoApiResponse {
    respond(location_studies_inner(&state, &path.coords, params).await)
}

async fn location_studies_inner(
    state: &AppState,
    coords: &str,
    params: Result<Query<LocationStudiesParams>, QueryRejection>,
) -> Result<StudiesResponse, ServiceError> {
    let Query(params) = params.map_err(invalid_query)?;

    let point: Coordinate = coords.parse()?;
    let include = Membership::location(point, params.radius)?;
    let limit = resolve_limit(params.limit, &state.limits)?;

    run(state, QueryPlan::lookup(include, limit)).await
}

pub(crate) fn location_studies_docs(op: TransformOperation) -> TransformOperation {
    op.description(
        "Find all studies reporting at least one coordinate within the radius of the given point.",
    )
        .response::<200, Json<StudiesResponse>>()
        .response_with::<400, Json<ErrorResponse>, _>(|t| {
            t.description("The coordinate or a parameter was malformed.")
        })
        .response_with::<500, Json<ErrorResponse>, _>(|t| {
            t.description("The database query failed.")
        })
}
