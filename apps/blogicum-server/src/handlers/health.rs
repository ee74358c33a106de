//! Health check endpoint.

use actix_web::{HttpResponse, web};

use blogicum_shared::dto::HealthResponse;

use crate::state::AppState;

/// GET /health/
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: state.clock.now(),
        storage: state.storage.to_string(),
    };

    HttpResponse::Ok().json(response)
}
