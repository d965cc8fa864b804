//! Gemini Gateway - Implementation of CompletionGateway for Google's Gemini API.
//!
//! Talks to the `generateContent` REST endpoint. Conversational requests go to
//! the chat model with the system preamble in `systemInstruction`; one-shot
//! prompts go to the (cheaper) one-shot model with nothing but the prompt.
//!
//! # Configuration
//!
//! ```ignore
//! let config = GeminiConfig::new(api_key)
//!     .with_chat_model("gemini-3-pro-preview")
//!     .with_once_model("gemini-3-flash-preview");
//!
//! let gateway = GeminiGateway::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::conversation::{Turn, TurnRole};
use crate::ports::{
    CompletionGateway, CompletionRequest, CompletionResponse, GatewayError, GatewayInfo,
    GenerationParams, TokenUsage,
};

/// Default REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for conversational completions.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-3-pro-preview";

/// Default model for one-shot prompts.
pub const DEFAULT_ONCE_MODEL: &str = "gemini-3-flash-preview";

/// Configuration for the Gemini gateway.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model used by `complete`.
    pub chat_model: String,
    /// Model used by `complete_once`.
    pub once_model: String,
    /// Base URL for the API.
    pub base_url: String,
}

impl GeminiConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            once_model: DEFAULT_ONCE_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Sets the chat model.
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Sets the one-shot model.
    pub fn with_once_model(mut self, model: impl Into<String>) -> Self {
        self.once_model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Gemini API gateway implementation.
pub struct GeminiGateway {
    config: GeminiConfig,
    client: Client,
}

impl GeminiGateway {
    /// Creates a new Gemini gateway with the given configuration.
    ///
    /// # Errors
    ///
    /// - `Network` if the HTTP client cannot be built (e.g. TLS backend failure)
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Builds the generateContent endpoint URL for a model.
    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.config.base_url, model)
    }

    /// Sends a request and decodes the reply.
    async fn generate(
        &self,
        model: &str,
        body: &GeminiRequest,
    ) -> Result<CompletionResponse, GatewayError> {
        debug!(model, contents = body.contents.len(), "Sending Gemini request");

        let response = self
            .client
            .post(self.generate_url(model))
            .header("x-goog-api-key", self.config.api_key())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    GatewayError::network(format!("Connection failed: {}", e))
                } else {
                    GatewayError::network(e.to_string())
                }
            })?;

        let response = Self::handle_response_status(response).await?;

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::parse(format!("Failed to parse response: {}", e)))?;

        let completion = extract_completion(gemini_response, model)?;
        debug!(
            model = %completion.model,
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "Gemini request completed"
        );
        Ok(completion)
    }

    /// Turns any non-success status into a `Status` error.
    async fn handle_response_status(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Gemini returned an error status");
        Err(GatewayError::status(status.as_u16(), error_body))
    }
}

#[async_trait]
impl CompletionGateway for GeminiGateway {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, GatewayError> {
        let body = to_gemini_request(&request);
        self.generate(&self.config.chat_model, &body).await
    }

    async fn complete_once(&self, prompt: &str) -> Result<CompletionResponse, GatewayError> {
        let body = GeminiRequest {
            contents: vec![GeminiContent::text("user", prompt)],
            system_instruction: None,
            generation_config: None,
        };
        self.generate(&self.config.once_model, &body).await
    }

    fn gateway_info(&self) -> GatewayInfo {
        GatewayInfo::new("gemini", &self.config.chat_model, &self.config.once_model)
    }
}

/// Maps a turn role to Gemini's role names.
fn gemini_role(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Assistant => "model",
    }
}

/// Converts our request to Gemini's format.
///
/// History order is preserved and the new message becomes the final user
/// entry. The preamble goes to `systemInstruction`, never into `contents`.
fn to_gemini_request(request: &CompletionRequest) -> GeminiRequest {
    let contents = request
        .ordered_turns()
        .iter()
        .map(|turn: &Turn| GeminiContent::text(gemini_role(turn.role()), turn.text()))
        .collect();

    GeminiRequest {
        contents,
        system_instruction: request
            .system_preamble
            .as_ref()
            .map(|preamble| GeminiSystemInstruction {
                parts: vec![GeminiTextPart {
                    text: preamble.clone(),
                }],
            }),
        generation_config: generation_config(&request.params),
    }
}

fn generation_config(params: &GenerationParams) -> Option<GeminiGenerationConfig> {
    if params.is_empty() {
        return None;
    }

    Some(GeminiGenerationConfig {
        temperature: params.temperature,
        max_output_tokens: params.max_output_tokens,
        thinking_config: params
            .thinking_budget
            .map(|thinking_budget| GeminiThinkingConfig { thinking_budget }),
    })
}

/// Pulls the reply text and usage out of a decoded response.
///
/// Thought parts are skipped. A response without visible text is an
/// `EmptyResponse`, whatever the reason (safety block, empty candidate list).
fn extract_completion(
    response: GeminiResponse,
    requested_model: &str,
) -> Result<CompletionResponse, GatewayError> {
    if let Some(error) = response.error {
        return Err(GatewayError::status(
            error.code.unwrap_or(500),
            error.message,
        ));
    }

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        debug!(reason, "Gemini blocked the prompt");
    }

    let text: String = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought.unwrap_or(false))
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GatewayError::EmptyResponse);
    }

    let usage = response
        .usage_metadata
        .map(|u| {
            TokenUsage::new(
                u.prompt_token_count.unwrap_or(0),
                u.candidates_token_count.unwrap_or(0),
            )
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: text,
        model: response
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        usage,
    })
}

// ----- Gemini API Types -----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

impl GeminiContent {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![GeminiTextPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<GeminiThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves one canned HTTP response and hands back the raw request.
    async fn serve_once(status_line: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            tx.send(request).ok();
        });

        (base_url, rx)
    }

    /// Reads headers, then as many body bytes as Content-Length announces.
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn gateway_at(base_url: &str) -> GeminiGateway {
        GeminiGateway::new(GeminiConfig::new("test-key").with_base_url(base_url)).unwrap()
    }

    fn decode(value: serde_json::Value) -> GeminiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn config_builder_works() {
        let config = GeminiConfig::new("test-key")
            .with_chat_model("gemini-pro-x")
            .with_once_model("gemini-flash-x")
            .with_base_url("https://proxy.example.com/v1beta/");

        assert_eq!(config.chat_model, "gemini-pro-x");
        assert_eq!(config.once_model, "gemini-flash-x");
        assert_eq!(config.base_url, "https://proxy.example.com/v1beta");
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn config_debug_redacts_api_key() {
        let config = GeminiConfig::new("super-secret");
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn generate_url_includes_model() {
        let gateway = GeminiGateway::new(GeminiConfig::new("k")).unwrap();
        assert_eq!(
            gateway.generate_url("gemini-3-pro-preview"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-pro-preview:generateContent"
        );
    }

    #[test]
    fn gateway_info_reports_models() {
        let gateway = GeminiGateway::new(GeminiConfig::new("k")).unwrap();
        let info = gateway.gateway_info();
        assert_eq!(info.name, "gemini");
        assert_eq!(info.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(info.once_model, DEFAULT_ONCE_MODEL);
    }

    #[test]
    fn request_maps_roles_and_appends_new_message() {
        let request = CompletionRequest::new("C").with_prior_turns(vec![
            Turn::assistant("Hi"),
            Turn::user("A"),
            Turn::assistant("B"),
        ]);

        let body = serde_json::to_value(to_gemini_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "model", "parts": [{"text": "Hi"}]},
                    {"role": "user", "parts": [{"text": "A"}]},
                    {"role": "model", "parts": [{"text": "B"}]},
                    {"role": "user", "parts": [{"text": "C"}]}
                ]
            })
        );
    }

    #[test]
    fn preamble_goes_to_system_instruction_verbatim() {
        let preamble = "Line one.\n\nLine two: don't interpolate.";
        let request = CompletionRequest::new("hello").with_system_preamble(preamble);

        let body = serde_json::to_value(to_gemini_request(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], preamble);
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn generation_config_serializes_camel_case() {
        let request = CompletionRequest::new("hello").with_params(
            GenerationParams::default()
                .with_temperature(0.5)
                .with_thinking_budget(32768),
        );

        let body = serde_json::to_value(to_gemini_request(&request)).unwrap();

        assert_eq!(
            body["generationConfig"],
            json!({"temperature": 0.5, "thinkingConfig": {"thinkingBudget": 32768}})
        );
    }

    #[test]
    fn empty_params_omit_generation_config() {
        let body = serde_json::to_value(to_gemini_request(&CompletionRequest::new("x"))).unwrap();
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn extracts_text_and_usage() {
        let response = decode(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3},
            "modelVersion": "gemini-3-pro-preview-001"
        }));

        let completion = extract_completion(response, "gemini-3-pro-preview").unwrap();

        assert_eq!(completion.content, "Hello there");
        assert_eq!(completion.model, "gemini-3-pro-preview-001");
        assert_eq!(completion.usage, TokenUsage::new(12, 3));
    }

    #[test]
    fn skips_thought_parts() {
        let response = decode(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "thinking about it", "thought": true},
                    {"text": "Answer."}
                ]}
            }]
        }));

        let completion = extract_completion(response, "m").unwrap();
        assert_eq!(completion.content, "Answer.");
        assert_eq!(completion.model, "m");
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        let response = decode(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert_eq!(
            extract_completion(response, "m"),
            Err(GatewayError::EmptyResponse)
        );
    }

    #[test]
    fn whitespace_only_text_is_empty_response() {
        let response = decode(json!({"candidates": [{"content": {"parts": [{"text": "  \n"}]}}]}));
        assert_eq!(
            extract_completion(response, "m"),
            Err(GatewayError::EmptyResponse)
        );
    }

    #[test]
    fn candidate_without_content_is_empty_response() {
        let response = decode(json!({"candidates": [{"finishReason": "SAFETY"}]}));
        assert_eq!(
            extract_completion(response, "m"),
            Err(GatewayError::EmptyResponse)
        );
    }

    #[test]
    fn error_object_without_code_is_server_error() {
        let response = decode(json!({"error": {"message": "internal"}}));
        assert_eq!(
            extract_completion(response, "m"),
            Err(GatewayError::status(500, "internal"))
        );
    }

    #[test]
    fn oversized_usage_counts_do_not_overflow() {
        let response = decode(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}}],
            "usageMetadata": {"promptTokenCount": 4294967295u32, "candidatesTokenCount": 1}
        }));

        let completion = extract_completion(response, "m").unwrap();

        assert_eq!(completion.usage.total_tokens, u32::MAX);
    }

    #[tokio::test]
    async fn complete_posts_to_chat_model_with_key_header() {
        let (base_url, request) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"Welcome aboard."}]}}]}"#,
        )
        .await;
        let gateway = gateway_at(&base_url);

        let completion = gateway
            .complete(CompletionRequest::new("hello").with_system_preamble("Be brief."))
            .await
            .unwrap();

        assert_eq!(completion.content, "Welcome aboard.");
        assert_eq!(completion.model, DEFAULT_CHAT_MODEL);
        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /models/gemini-3-pro-preview:generateContent HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
        assert!(raw.contains(r#""systemInstruction":{"parts":[{"text":"Be brief."}]}"#));
    }

    #[tokio::test]
    async fn complete_once_uses_once_model() {
        let (base_url, request) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"Polished."}]}}]}"#,
        )
        .await;

        let completion = gateway_at(&base_url).complete_once("rain").await.unwrap();

        assert_eq!(completion.content, "Polished.");
        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /models/gemini-3-flash-preview:generateContent"));
        assert!(!raw.contains("systemInstruction"));
    }

    #[tokio::test]
    async fn non_success_status_becomes_status_error() {
        let (base_url, _request) = serve_once("503 Service Unavailable", r#"{"error":"overloaded"}"#).await;

        let result = gateway_at(&base_url).complete(CompletionRequest::new("hello")).await;

        assert_eq!(
            result,
            Err(GatewayError::status(503, r#"{"error":"overloaded"}"#))
        );
    }

    #[tokio::test]
    async fn undecodable_body_becomes_parse_error() {
        let (base_url, _request) = serve_once("200 OK", "not json").await;

        let result = gateway_at(&base_url).complete_once("rain").await;

        assert!(matches!(result, Err(GatewayError::Parse(_))));
    }

    #[tokio::test]
    async fn refused_connection_becomes_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = gateway_at(&base_url).complete(CompletionRequest::new("hello")).await;

        assert!(matches!(result, Err(GatewayError::Network(_))));
    }

    #[test]
    fn error_object_becomes_status_error() {
        let response = decode(json!({"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}));
        assert_eq!(
            extract_completion(response, "m"),
            Err(GatewayError::status(429, "quota"))
        );
    }
}
