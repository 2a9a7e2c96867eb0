use actix_web::{HttpResponse, Responder};
use serde_json::json;

use super::envelope;

/// Liveness probe.
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(envelope(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
