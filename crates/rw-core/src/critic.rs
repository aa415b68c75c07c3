//! # AI Critic
//!
//! Request/response types for the [`StoryCritic`] port and the bounded call
//! that story creation goes through. A critic that errors or runs past its
//! deadline is replaced by [`CriticResponse::fallback`], so story creation
//! never fails because of the critic.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AiRating;
use crate::traits::StoryCritic;

/// Error types for critic calls. All of them are absorbed by [`assess`].
#[derive(Debug, Error)]
pub enum CriticError {
    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status or provider-side failure
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Reply was empty or not the expected JSON shape
    #[error("parse error: {0}")]
    Parse(String),
}

/// What the critic is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueRequest {
    pub title: String,
    pub genre: Option<String>,
    pub content: String,
}

/// Title and body of a discussion story the critic may propose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionPost {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticResponse {
    #[serde(default)]
    pub rating: Option<AiRating>,
    /// Free-text critique, posted as an AI comment on the story.
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub ai_post: Option<DiscussionPost>,
}

pub const FALLBACK_SCORE: f64 = 5.0;
const UNDETERMINED: &str = "Could not be determined";

impl CriticResponse {
    /// The neutral rating used whenever the critic is unavailable.
    pub fn fallback() -> Self {
        Self {
            rating: Some(AiRating {
                overall_score: FALLBACK_SCORE,
                feedback: "An error occurred while analysing the story".to_string(),
                popularity: FALLBACK_SCORE,
                strengths: vec![UNDETERMINED.to_string()],
                improvements: vec![UNDETERMINED.to_string()],
                genre: Some(UNDETERMINED.to_string()),
            }),
            comment: None,
            ai_post: None,
        }
    }
}

/// Stands in when no critic backend is configured; every story gets the
/// fallback rating.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineCritic;

#[async_trait]
impl StoryCritic for OfflineCritic {
    async fn review(&self, _request: &CritiqueRequest) -> Result<CriticResponse, CriticError> {
        Err(CriticError::RequestFailed("no critic configured".to_string()))
    }
}

/// Asks `critic` for a review, bounded by `timeout`.
pub async fn assess(
    critic: &dyn StoryCritic,
    request: &CritiqueRequest,
    timeout: Duration,
) -> CriticResponse {
    match tokio::time::timeout(timeout, critic.review(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            log::warn!("critic failed for \"{}\": {}", request.title, e);
            CriticResponse::fallback()
        }
        Err(_) => {
            log::warn!(
                "critic timed out after {:?} for \"{}\"",
                timeout,
                request.title
            );
            CriticResponse::fallback()
        }
    }
}
