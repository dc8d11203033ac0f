use aide::axum::routing::{get, get_with};
use aide::axum::{ApiRouter, IntoApiResponse};
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::{http::StatusCode, Json};
use tower_http::services::ServeFile;

use crate::store::DbReport;
use crate::AppState;

pub(crate) fn system_routes(state: &AppState) -> ApiRouter<AppState> {
    ApiRouter::new()
        .api_route("/", get(health))
        .api_route("/version", get(get_version))
        .route_service("/img", ServeFile::new(&state.image))
        .api_route("/test_db", get_with(test_db, test_db_docs))
}

async fn health() -> impl IntoApiResponse {
    (StatusCode::OK, "Server working!")
}

async fn get_version() -> impl IntoApiResponse {
    (
        StatusCode::OK,
        format!("{}:{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    )
}

pub(crate) async fn test_db(State(state): State<AppState>) -> impl IntoApiResponse {
    let mut report = DbReport::new(state.store.dialect());
    match state.store.diagnostics(&mut report).await {
        Ok(()) => {
            report.ok = true;
            (StatusCode::OK, Json(report))
        }
        Err(error) => {
            report.error = Some(error.to_string());
            (error.status(), Json(report))
        }
    }
}

fn test_db_docs(op: TransformOperation) -> TransformOperation {
    op.description("Check database connectivity and report row counts and sample rows.")
        .response::<200, Json<DbReport>>()
        .response_with::<500, Json<DbReport>, _>(|t| {
            t.description("The database could not be reached or queried.")
        })
}
