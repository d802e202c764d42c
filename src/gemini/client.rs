//! HTTP client for the Gemini REST API.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, error, warn};

use super::backend::{BackendError, Fragment, FragmentStream, GenerativeBackend};
use super::sse::SseDecoder;
use super::types::{
    ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse, PredictRequest,
    PredictResponse, WirePart,
};
use crate::conversation::GeneratedImage;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Finish reasons of a candidate that ended normally. Any other reason on a
/// candidate without parts means the reply was withheld.
const NORMAL_FINISH_REASONS: &[&str] = &["STOP", "MAX_TOKENS", "FINISH_REASON_UNSPECIFIED"];

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiClient {
    /// Create a client. A missing key is not an error until a request is made.
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("Gemini API key not set; requests will fail until one is configured");
        }
        Self {
            http: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str, BackendError> {
        self.api_key.as_deref().ok_or(BackendError::MissingApiKey)
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            model,
            method
        )
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn stream_generate(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<FragmentStream, BackendError> {
        let api_key = self.api_key()?;
        let url = self.model_url(model, "streamGenerateContent");

        debug!(
            model,
            contents = request.contents.len(),
            tools = request.tools.len(),
            "Starting streamed completion"
        );

        let response = self
            .http
            .post(&url)
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(fragment_stream(response.bytes_stream()))
    }

    async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<GeneratedImage, BackendError> {
        let api_key = self.api_key()?;
        let url = self.model_url(model, "predict");

        debug!(model, prompt_len = prompt.len(), "Requesting image");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&PredictRequest::single_png(prompt))
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: PredictResponse = response.json().await?;
        body.predictions
            .into_iter()
            .find_map(|p| {
                p.bytes_base64_encoded.map(|data| GeneratedImage {
                    prompt: prompt.to_string(),
                    mime_type: p.mime_type.unwrap_or_else(|| "image/png".to_string()),
                    data,
                })
            })
            .ok_or(BackendError::NoImage)
    }
}

/// Turn a non-2xx response into [`BackendError::Api`].
async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log_http_error(status, &body);

    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Log common HTTP error patterns for debugging.
fn log_http_error(status: StatusCode, body: &str) {
    match status.as_u16() {
        400 => error!("HTTP 400 Bad Request - likely invalid model name or request format"),
        401 | 403 => error!("HTTP {} - API key may be missing, invalid or lack access", status.as_u16()),
        404 => error!("HTTP 404 Not Found - model name may be invalid"),
        429 => error!("HTTP 429 Rate Limited - too many requests"),
        500..=599 => error!("HTTP {} Server Error - API issue", status.as_u16()),
        _ => error!(status = status.as_u16(), "HTTP error"),
    }

    if !body.is_empty() {
        error!("API Error Body: {}", body);
    }
}

/// Convert one decoded stream chunk into fragments, in part order.
pub fn fragments_from_chunk(chunk: GenerateContentResponse) -> Result<Vec<Fragment>, BackendError> {
    if chunk.candidates.is_empty() {
        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(BackendError::Blocked(reason));
        }
        return Ok(vec![]);
    }

    let mut fragments = Vec::new();
    // Only one candidate is requested
    if let Some(candidate) = chunk.candidates.into_iter().next() {
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        if parts.is_empty() {
            if let Some(reason) = candidate.finish_reason {
                if !NORMAL_FINISH_REASONS.contains(&reason.as_str()) {
                    return Err(BackendError::Blocked(reason));
                }
            }
        }

        for part in parts {
            match part {
                WirePart::Text { thought: Some(true), .. } => {}
                WirePart::Text { text, .. } if !text.is_empty() => {
                    fragments.push(Fragment::Text(text))
                }
                WirePart::FunctionCall {
                    function_call,
                    thought_signature,
                } => fragments.push(Fragment::CallRequest {
                    call: function_call,
                    thought_signature,
                }),
                _ => {}
            }
        }
    }
    Ok(fragments)
}

/// State carried between polls of the fragment stream.
struct StreamState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<Fragment, BackendError>>,
    /// No more bytes will be read
    done: bool,
}

impl<S> StreamState<S> {
    fn enqueue_event(&mut self, data: &str) {
        if self.done {
            return;
        }
        let parsed = serde_json::from_str::<GenerateContentResponse>(data)
            .map_err(BackendError::from)
            .and_then(fragments_from_chunk);
        match parsed {
            Ok(fragments) => self.pending.extend(fragments.into_iter().map(Ok)),
            Err(e) => {
                self.pending.push_back(Err(e));
                self.done = true;
            }
        }
    }
}

/// Decode an SSE byte stream into an ordered [`FragmentStream`].
///
/// The stream ends after the first error.
pub fn fragment_stream<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<BackendError> + Send + 'static,
{
    let state = StreamState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for event in state.decoder.push(chunk.as_ref()) {
                        state.enqueue_event(&event);
                        if state.done {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(e.into()));
                    state.done = true;
                }
                None => {
                    if let Some(event) = state.decoder.finish() {
                        state.enqueue_event(&event);
                    }
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}
