use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", get(list_gate_passes).post(issue_gate_pass))
}

pub async fn list_gate_passes(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_gate_passes().await {
        Ok(gate_passes) => Json(gate_passes).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Issue a gate pass and reconcile stock for every line item in one commit.
pub async fn issue_gate_pass(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::GatePassRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let draft = match body.into_draft() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.issue(draft).await {
        Ok(gate_pass) => (StatusCode::CREATED, Json(gate_pass)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
