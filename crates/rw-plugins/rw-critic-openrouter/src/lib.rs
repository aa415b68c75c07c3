//! # rw-critic-openrouter
//!
//! `StoryCritic` backed by an OpenAI-compatible chat-completions endpoint.
//! Defaults to OpenRouter, but any compatible server (vLLM, Ollama, OpenAI)
//! works by changing the base URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use rw_core::critic::{CriticError, CriticResponse, CritiqueRequest};
use rw_core::traits::StoryCritic;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3-0324:free";
pub const DEFAULT_SITE_NAME: &str = "AI Writers App";

const SYSTEM_PROMPT: &str = r#"You are a strict and demanding literary critic with many years of experience. Your task is to give the user's work an unsparing, impartial analysis and a detailed critical assessment.

Be as honest and objective as possible. Your goal is not to praise but to point out every weakness of the work and propose concrete ways to improve it. Even if the piece seems good, find its weak spots.

Even highly rated works must always come with at least 3-5 concrete recommendations. Avoid generic phrases like "work on your style"; give precise, practical advice.

Judge the work on:
- Style and language (correctness, word choice, imagery)
- Structure and composition (logic of construction, plot development)
- Originality and creative approach
- Credibility of characters and dialogue
- Fit with the genre and target audience
- Emotional impact

Reply in this JSON format:
{
  "rating": {
    "overallScore": number from 1 to 9 (avoid 10, be strict, very rarely go above 7),
    "feedback": "short overall critical review focused on the weaknesses",
    "popularity": number from 1 to 8 (be realistic, avoid inflated numbers),
    "strengths": ["strength 1", "strength 2", ...],
    "improvements": ["concrete recommendation 1", "concrete recommendation 2", "concrete recommendation 3", ...],
    "genre": "the genre of the work"
  },
  "comment": "an extended critical comment on the work from the AI critic, with a deep analysis of its flaws and examples from the text",
  "aiPost": {
    "title": "title for a discussion post about this work",
    "content": "text of a discussion post that critically analyses the work and invites debate about its strengths and weaknesses"
  }
}

Important: reply with JSON only, without explanations or code markers."#;

/// OpenAI-compatible critic.
pub struct OpenRouterCritic {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    site_url: Option<String>,
    site_name: String,
    request_timeout: Option<Duration>,
}

impl OpenRouterCritic {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, CriticError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| CriticError::Network(format!("build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            site_url: None,
            site_name: DEFAULT_SITE_NAME.to_string(),
            request_timeout: None,
        })
    }

    /// Critic for the public OpenRouter API with the default model.
    pub fn openrouter(api_key: impl Into<String>) -> Result<Self, CriticError> {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL, Some(api_key.into()))
    }

    /// Attribution sent as `HTTP-Referer` / `X-Title`.
    pub fn with_site(mut self, site_url: Option<String>, site_name: impl Into<String>) -> Self {
        self.site_url = site_url;
        self.site_name = site_name.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, request: &CritiqueRequest) -> ChatRequest {
        let genre = request.genre.as_deref().unwrap_or("Not specified");
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Title: {}\n\nGenre: {}\n\nContent:\n{}",
                        request.title, genre, request.content
                    ),
                },
            ],
            response_format: ResponseFormatRequest {
                format_type: "json_object",
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormatRequest,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormatRequest {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

/// Parses the model's reply, tolerating markdown code fences around it.
pub fn parse_reply(content: &str) -> Result<CriticResponse, CriticError> {
    let cleaned = if content.contains("```") {
        content
            .replace("```json\n", "")
            .replace("```\n", "")
            .replace("```", "")
    } else {
        content.to_string()
    };
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(CriticError::Parse("empty reply".into()));
    }

    let response: CriticResponse =
        serde_json::from_str(cleaned).map_err(|e| CriticError::Parse(e.to_string()))?;
    if response.rating.is_none() {
        return Err(CriticError::Parse("reply carries no rating".into()));
    }
    Ok(response)
}

#[async_trait]
impl StoryCritic for OpenRouterCritic {
    async fn review(&self, request: &CritiqueRequest) -> Result<CriticResponse, CriticError> {
        let mut http_request = self
            .client
            .post(self.chat_completions_url())
            .header("X-Title", &self.site_name)
            .json(&self.build_request(request));

        if let Some(key) = &self.api_key {
            http_request = http_request.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        if let Some(site_url) = &self.site_url {
            http_request = http_request.header(header::REFERER, site_url);
        }
        if let Some(timeout) = self.request_timeout {
            http_request = http_request.timeout(timeout);
        }

        log::debug!("asking {} to review \"{}\"", self.model, request.title);
        let response = http_request
            .send()
            .await
            .map_err(|e| CriticError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CriticError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| CriticError::Parse(e.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CriticError::Parse("no content in response".into()))?;

        parse_reply(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REPLY: &str = r#"{
        "rating": {
            "overallScore": 6,
            "feedback": "Competent but safe",
            "popularity": 3,
            "strengths": ["setting"],
            "improvements": ["raise the stakes", "trim adverbs", "vary sentence length"],
            "genre": "mystery"
        },
        "comment": "The reveal is telegraphed from page one.",
        "aiPost": { "title": "Fair-play mysteries", "content": "Should the reader be able to solve it?" }
    }"#;

    fn request() -> CritiqueRequest {
        CritiqueRequest {
            title: "The Lighthouse".into(),
            genre: None,
            content: "The lamp went dark at nine.".into(),
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({ "choices": [{ "message": { "content": content } }] })
    }

    #[test]
    fn parses_fenced_reply() {
        let fenced = format!("```json\n{REPLY}\n```");
        let response = parse_reply(&fenced).unwrap();
        assert_eq!(response.rating.unwrap().overall_score, 6.0);
        assert_eq!(
            response.comment.as_deref(),
            Some("The reveal is telegraphed from page one.")
        );
    }

    #[test]
    fn rejects_prose_and_ratingless_replies() {
        assert!(matches!(
            parse_reply("I think it's great!"),
            Err(CriticError::Parse(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"comment": "nice"}"#),
            Err(CriticError::Parse(_))
        ));
        assert!(matches!(parse_reply("  "), Err(CriticError::Parse(_))));
    }

    #[test]
    fn user_message_names_missing_genre() {
        let critic = OpenRouterCritic::new("http://localhost:1/v1/", "m", None).unwrap();
        let body = critic.build_request(&request());
        assert_eq!(critic.chat_completions_url(), "http://localhost:1/v1/chat/completions");
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(
            body.messages[1].content,
            "Title: The Lighthouse\n\nGenre: Not specified\n\nContent:\nThe lamp went dark at nine."
        );
    }

    #[tokio::test]
    async fn reviews_through_chat_completions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header_eq("authorization", "Bearer test-key"))
            .and(header_eq("x-title", "Test Site"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "response_format": { "type": "json_object" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(REPLY)))
            .expect(1)
            .mount(&server)
            .await;

        let critic = OpenRouterCritic::new(server.uri(), "test-model", Some("test-key".into()))
            .unwrap()
            .with_site(Some("http://localhost:3000".into()), "Test Site");
        let response = critic.review(&request()).await.unwrap();

        assert_eq!(response.rating.unwrap().genre.as_deref(), Some("mystery"));
        assert_eq!(response.ai_post.unwrap().title, "Fair-play mysteries");
    }

    #[tokio::test]
    async fn http_error_is_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let critic = OpenRouterCritic::new(server.uri(), "m", None).unwrap();
        let err = critic.review(&request()).await.unwrap_err();
        assert!(matches!(err, CriticError::RequestFailed(msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn empty_choices_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let critic = OpenRouterCritic::new(server.uri(), "m", None).unwrap();
        assert!(matches!(
            critic.review(&request()).await,
            Err(CriticError::Parse(_))
        ));
    }
}
