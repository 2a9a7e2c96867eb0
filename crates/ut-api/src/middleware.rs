//! unitrade/crates/ut-api/src/middleware.rs Middleware
//!
//! Access logging and cross-origin policy for the UniTrade API.

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::Logger;

/// Access log in the default format:
/// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

/// The SPA runs on its own origin and sends the session cookie, so only the
/// configured origins are allowed and credentials are on.
pub fn cors_policy(origins: &[String]) -> Cors {
    let cors = origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin));

    cors.supports_credentials()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(3600)
}
