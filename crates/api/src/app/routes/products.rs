use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};

use gatepass_core::ProductId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(receive_product))
        .route("/:id", get(get_product).delete(delete_product))
        .route("/:id/quantity", patch(override_quantity))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_products().await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Intake: replenishes a matching product (200) or creates a new one (201).
pub async fn receive_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ProductIntakeRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let intake = match body.into_intake() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.receive(intake).await {
        Ok(outcome) => {
            let status = if outcome.created { StatusCode::CREATED } else { StatusCode::OK };
            (status, Json(outcome.product)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.product(&product_id).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.remove_product(&product_id).await {
        Ok(()) => Json(serde_json::json!({ "message": "Product deleted successfully" })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn override_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::QuantityOverrideRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let quantity = match body.quantity() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.override_quantity(&product_id, quantity).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}
