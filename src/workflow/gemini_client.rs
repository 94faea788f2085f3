use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ApiSettings;
use crate::error_codes::CodedError;
use crate::workflow::types::GeneratedImage;

const FALLBACK_SOURCE_MIME: &str = "image/webp";
const ERROR_BODY_LIMIT: usize = 600;

/// The two remote operations the art workflows depend on.
pub trait ImageGenerator {
    /// Text-to-image.
    fn generate(&self, prompt: &str) -> Result<GeneratedImage>;

    /// Image-plus-instruction edit of the image at `source`.
    fn edit(&self, source: &Path, instruction: &str) -> Result<GeneratedImage>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: Url,
    generate_model: String,
    edit_model: String,
}

impl GeminiClient {
    pub fn new(settings: &ApiSettings, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            http,
            api_key,
            base_url: settings.base_url.clone(),
            generate_model: settings.generate_model.clone(),
            edit_model: settings.edit_model.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    fn call(&self, model: &str, request: &GenerateContentRequest) -> Result<GeneratedImage> {
        let endpoint = self.endpoint(model);
        tracing::debug!(%endpoint, "calling generateContent");

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .map_err(|error| request_error("failed to call Gemini API", error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CodedError::request_failed(format!(
                "Gemini API returned {status}: {}",
                truncate(body.trim(), ERROR_BODY_LIMIT)
            ))
            .into());
        }

        let payload: GenerateContentResponse = response
            .json()
            .map_err(|error| request_error("failed to decode Gemini response", error))?;
        extract_inline_image(payload)
    }
}

impl ImageGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart::Text {
                    text: prompt.to_owned(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["IMAGE"],
            }),
        };
        self.call(&self.generate_model, &request)
    }

    fn edit(&self, source: &Path, instruction: &str) -> Result<GeneratedImage> {
        let source_bytes = fs::read(source).map_err(|error| {
            request_error(
                &format!("failed to read source image {}", source.display()),
                error,
            )
        })?;
        let request = edit_request(instruction, &source_bytes);
        self.call(&self.edit_model, &request)
    }
}

fn edit_request(instruction: &str, source_bytes: &[u8]) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![RequestContent {
            parts: vec![
                RequestPart::Text {
                    text: instruction.to_owned(),
                },
                RequestPart::InlineData {
                    inline_data: RequestInlineData {
                        mime_type: sniff_mime_type(source_bytes).to_owned(),
                        data: BASE64.encode(source_bytes),
                    },
                },
            ],
        }],
        generation_config: None,
    }
}

pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_SOURCE_MIME)
}

/// Returns the first inline image part of the first candidate.
pub fn extract_inline_image(response: GenerateContentResponse) -> Result<GeneratedImage> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.inline_data))
        .ok_or(CodedError::no_image_data())?;

    let data = BASE64
        .decode(inline.data.as_bytes())
        .map_err(|error| request_error("inline image data was not valid base64", error))?;
    if data.is_empty() {
        return Err(CodedError::no_image_data().into());
    }
    Ok(GeneratedImage::new(data, inline.mime_type))
}

fn request_error(what: &str, error: impl Into<anyhow::Error>) -> anyhow::Error {
    let error = error.into();
    let message = format!("{what}: {error:#}");
    error.context(CodedError::request_failed(message))
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: RequestInlineData },
}

#[derive(Debug, Serialize)]
struct RequestInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    data: String,
}
