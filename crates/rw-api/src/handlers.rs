//! # rw-api Handlers
//!
//! This module coordinates the flow between HTTP requests and core services.
//! Handlers only translate: JSON in, service call, JSON or error status out.

use actix_web::{web, HttpResponse, Responder};
use rw_core::error::{AppError, Result};
use rw_core::feed::StoryQuery;
use rw_core::models::{Credentials, NewComment, NewStory, NewUser, ProfileUpdate};
use rw_core::services::stories::AI_USERNAME;
use rw_core::services::{StoryService, UserService};
use serde::{Deserialize, Serialize};

/// State shared across all Actix-web workers.
pub struct AppState {
    pub stories: StoryService,
    pub users: UserService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Maps a domain error onto an HTTP status with a `{"error": ..}` body.
fn error_response(err: &AppError) -> HttpResponse {
    let mut builder = match err {
        AppError::NotFound(_, _) => HttpResponse::NotFound(),
        AppError::ValidationError(_) => HttpResponse::UnprocessableEntity(),
        AppError::Unauthorized(_) => HttpResponse::Unauthorized(),
        AppError::Conflict(_) => HttpResponse::Conflict(),
        AppError::StoreUnavailable(_) => HttpResponse::ServiceUnavailable(),
        AppError::Internal(_) => HttpResponse::InternalServerError(),
    };
    if matches!(err, AppError::StoreUnavailable(_) | AppError::Internal(_)) {
        log::error!("request failed: {}", err);
    }
    builder.json(serde_json::json!({ "error": err.to_string() }))
}

fn respond<T: Serialize>(result: Result<T>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(&e),
    }
}

fn respond_created<T: Serialize>(result: Result<T>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Created().json(value),
        Err(e) => error_response(&e),
    }
}

/// Absent results become 404s.
fn respond_found<T: Serialize>(result: Result<Option<T>>, entity: &str, id: &str) -> HttpResponse {
    match result {
        Ok(Some(value)) => HttpResponse::Ok().json(value),
        Ok(None) => error_response(&AppError::not_found(entity, id)),
        Err(e) => error_response(&e),
    }
}

pub async fn register(data: web::Data<AppState>, body: web::Json<NewUser>) -> impl Responder {
    respond_created(data.users.register(body.into_inner()).await)
}

pub async fn login(data: web::Data<AppState>, body: web::Json<Credentials>) -> impl Responder {
    respond(data.users.login(body.into_inner()).await)
}

pub async fn get_user(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = path.into_inner();
    respond_found(data.users.get_user(&user_id).await, "User", &user_id)
}

pub async fn update_profile(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ProfileUpdate>,
) -> impl Responder {
    let user_id = path.into_inner();
    respond(data.users.update_profile(&user_id, body.into_inner()).await)
}

pub async fn change_password(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PasswordChange>,
) -> impl Responder {
    let user_id = path.into_inner();
    let change = body.into_inner();
    match data
        .users
        .change_password(&user_id, &change.current_password, &change.new_password)
        .await
    {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

pub async fn user_stories(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    respond(data.stories.list_user_stories(&path.into_inner()).await)
}

/// Lists stories, optionally filtered (`?q=`) and sorted (`?sort=`).
pub async fn list_stories(
    data: web::Data<AppState>,
    query: web::Query<StoryQuery>,
) -> impl Responder {
    respond(data.stories.feed(&query).await)
}

/// Publishing waits for the critic (bounded by its timeout).
pub async fn create_story(data: web::Data<AppState>, body: web::Json<NewStory>) -> impl Responder {
    respond_created(data.stories.create_story(body.into_inner()).await)
}

pub async fn get_story(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let story_id = path.into_inner();
    respond_found(data.stories.get_story(&story_id).await, "Story", &story_id)
}

pub async fn like_story(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let story_id = path.into_inner();
    respond_found(data.stories.like_story(&story_id).await, "Story", &story_id)
}

pub async fn add_comment(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<NewComment>,
) -> impl Responder {
    let story_id = path.into_inner();
    match data.stories.add_comment(&story_id, body.into_inner()).await {
        Ok(Some(comment)) => HttpResponse::Created().json(comment),
        Ok(None) => error_response(&AppError::not_found("Story", &story_id)),
        Err(e) => error_response(&e),
    }
}

/// 404 until the critic has posted something or the account was created.
pub async fn ai_user(data: web::Data<AppState>) -> impl Responder {
    respond_found(data.stories.ai_user().await, "User", AI_USERNAME)
}

pub async fn ensure_ai_user(data: web::Data<AppState>) -> impl Responder {
    respond(data.stories.get_or_create_ai_user().await)
}
