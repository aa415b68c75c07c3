//! rusty-writers/crates/rw-api/src/middleware.rs Middleware
//!
//! Access logging and cross-origin policy for the API.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// Request log line: remote-ip "request-line" status-code size time-taken.
pub fn standard_middleware() -> Logger {
    Logger::new("%a \"%r\" %s %b %Dms")
}

/// The browser frontend is usually served from a different origin.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT"])
        .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
        .max_age(3600)
}
