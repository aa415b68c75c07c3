//! # rw-api
//!
//! The JSON routing layer for Rusty-Writers.

pub mod handlers;
pub mod middleware;

use actix_web::web;

pub use handlers::AppState;

/// Configures the routes for the story platform.
///
/// # Developer Note
/// Everything lives under one `/api` scope so the binary can serve static
/// frontend assets next to it without path clashes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Accounts
            .route("/auth/register", web::post().to(handlers::register))
            .route("/auth/login", web::post().to(handlers::login))
            .route("/users/{user_id}", web::get().to(handlers::get_user))
            .route("/users/{user_id}", web::put().to(handlers::update_profile))
            .route("/users/{user_id}/password", web::post().to(handlers::change_password))
            .route("/users/{user_id}/stories", web::get().to(handlers::user_stories))
            // Stories
            .route("/stories", web::get().to(handlers::list_stories))
            .route("/stories", web::post().to(handlers::create_story))
            .route("/stories/{story_id}", web::get().to(handlers::get_story))
            .route("/stories/{story_id}/like", web::post().to(handlers::like_story))
            .route("/stories/{story_id}/comments", web::post().to(handlers::add_comment))
            // The critic's own account
            .route("/ai-user", web::get().to(handlers::ai_user))
            .route("/ai-user", web::post().to(handlers::ensure_ai_user)),
    );
}
