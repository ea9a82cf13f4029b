use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.summary().await {
        Ok(summary) => Json(serde_json::json!({
            "message": "Gate pass API is running",
            "products": summary.products,
            "gatePasses": summary.gate_passes,
            "dataStorage": summary.backend,
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
