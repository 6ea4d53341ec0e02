//! OpenAI REST calls used by the pipeline.
//!
//! [`GenerativeApi`] is the seam between the pipeline and the network; the
//! reqwest-backed [`OpenAiClient`] is the real implementation.

use std::future::Future;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::constants::{IMAGE_DOWNLOAD_TIMEOUT, OPENAI_API_BASE};
use crate::error::WordImageError;
use crate::pricing::Quality;

/// Token counts reported for a chat completion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Model the completion ran on
    pub model: String,
    /// Prompt tokens
    pub prompt_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
    /// Prompt plus completion
    pub total_tokens: u64,
}

/// Token counts reported for an image edit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUsage {
    /// Text prompt tokens
    pub text_tokens: u64,
    /// Input image tokens
    pub image_tokens: u64,
    /// Generated image tokens
    pub output_tokens: u64,
    /// Total reported by the API
    pub total_tokens: u64,
}

/// A system + user chat completion request.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// Model name
    pub model: String,
    /// System message
    pub system: String,
    /// User message
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
}

/// The assistant message and its usage.
#[derive(Clone, Debug)]
pub struct ChatCompletion {
    /// Raw assistant text
    pub content: String,
    /// Reported usage
    pub usage: TokenUsage,
}

/// An image edit request against one base image.
#[derive(Clone, Copy, Debug)]
pub struct ImageEditRequest<'a> {
    /// Model name
    pub model: &'a str,
    /// Base image file contents
    pub image: &'a [u8],
    /// File name sent with the image part, its extension picks the mime type
    pub image_name: &'a str,
    /// Illustration prompt
    pub prompt: &'a str,
    /// Output size, eg `1024x1024`
    pub size: &'a str,
    /// Requested tier
    pub quality: Quality,
}

/// Where the generated image can be found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImagePayload {
    /// Inline base64 PNG
    Base64(String),
    /// Hosted URL that still has to be downloaded
    Url(String),
}

/// Generated image and its usage.
#[derive(Clone, Debug)]
pub struct ImageEdit {
    /// Image data or link
    pub payload: ImagePayload,
    /// Reported usage
    pub usage: ImageUsage,
}

/// The external calls the pipeline depends on.
pub trait GenerativeApi {
    /// Runs a chat completion
    fn chat_completion(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatCompletion, WordImageError>> + Send;

    /// Edits the base image according to the prompt
    fn edit_image(
        &self,
        request: &ImageEditRequest<'_>,
    ) -> impl Future<Output = Result<ImageEdit, WordImageError>> + Send;

    /// Downloads an image returned by URL
    fn download_image(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Vec<u8>, WordImageError>> + Send;
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize, Debug)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize, Debug)]
struct ImagesResponse {
    data: Vec<ImageData>,
    #[serde(default)]
    usage: Option<ImagesUsage>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ImagesUsage {
    #[serde(default)]
    total_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    input_tokens_details: InputTokensDetails,
}

#[derive(Deserialize, Debug, Default)]
struct InputTokensDetails {
    #[serde(default)]
    text_tokens: u64,
    #[serde(default)]
    image_tokens: u64,
}

/// Thin OpenAI client over a shared [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiClient {
    /// Client against the public API
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http, OPENAI_API_BASE, api_key)
    }

    /// Client against another OpenAI-compatible base URL, eg a proxy
    pub fn with_base_url(
        http: reqwest::Client,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }
}

/// Reads an error body into something worth logging.
async fn error_body(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    format!("OpenAI API error {status}: {body}")
}

/// Mime type for an image file name, by extension
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

impl GenerativeApi for OpenAiClient {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatCompletion, WordImageError> {
        let req_body = json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let resp = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&req_body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(WordImageError::Transport(error_body(resp).await));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|err| WordImageError::Transport(format!("unreadable chat response: {err}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| WordImageError::Validation("chat response had no content".to_string()))?;
        if let Some(served_by) = parsed.model.as_deref() {
            debug!("Chat completion served by {served_by}");
        }
        let usage = parsed.usage.unwrap_or_default();
        debug!(
            "Chat completion used {} prompt / {} completion tokens",
            usage.prompt_tokens, usage.completion_tokens
        );

        Ok(ChatCompletion {
            content,
            usage: TokenUsage {
                // priced by the requested name, not the dated snapshot the API reports
                model: request.model.clone(),
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
        })
    }

    async fn edit_image(&self, request: &ImageEditRequest<'_>) -> Result<ImageEdit, WordImageError> {
        let mut part = Part::bytes(request.image.to_vec()).file_name(request.image_name.to_string());
        if let Some(mime) = mime_for_path(Path::new(request.image_name)) {
            part = part.mime_str(mime).map_err(|err| {
                WordImageError::Generation(format!("invalid mime {mime}: {err}"))
            })?;
        }
        let form = Form::new()
            .text("model", request.model.to_string())
            .text("prompt", request.prompt.to_string())
            .text("size", request.size.to_string())
            .text("quality", request.quality.as_str())
            .text("n", "1")
            .part("image", part);

        let resp = self
            .http
            .post(self.endpoint("images/edits"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|err| WordImageError::Generation(format!("request to images/edits failed: {err}")))?;
        if !resp.status().is_success() {
            return Err(WordImageError::Generation(error_body(resp).await));
        }

        let parsed: ImagesResponse = resp
            .json()
            .await
            .map_err(|err| WordImageError::Generation(format!("unreadable images response: {err}")))?;
        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| WordImageError::Generation("No image data returned".to_string()))?;
        let payload = match (first.b64_json, first.url) {
            (Some(b64), _) => ImagePayload::Base64(b64),
            (None, Some(url)) => ImagePayload::Url(url),
            (None, None) => {
                return Err(WordImageError::Generation(
                    "Image response missing b64_json and url fields".to_string(),
                ));
            }
        };
        let usage = parsed.usage.unwrap_or_default();

        Ok(ImageEdit {
            payload,
            usage: ImageUsage {
                text_tokens: usage.input_tokens_details.text_tokens,
                image_tokens: usage.input_tokens_details.image_tokens,
                output_tokens: usage.output_tokens,
                total_tokens: usage.total_tokens,
            },
        })
    }

    async fn download_image(&self, url: &str) -> Result<Vec<u8>, WordImageError> {
        let resp = self
            .http
            .get(url)
            .timeout(IMAGE_DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|err| WordImageError::Generation(format!("Failed to download image URL: {err}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(WordImageError::Generation(format!(
                "Image download error {status}"
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| WordImageError::Generation(format!("Failed to read image bytes: {err}")))?;
        Ok(bytes.to_vec())
    }
}
