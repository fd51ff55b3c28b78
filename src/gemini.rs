use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{AspectRatio, EncodedAsset, GenerationRequest, GenerationResult, Style};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("service error: status={status} body={body}")]
    Service { status: u16, body: String },
    #[error("could not parse response: {0}")]
    Parse(String),
    #[error("no image was generated{}", reason_suffix(.reason))]
    NoImageReturned { reason: Option<String> },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default()
}

/// Anything that can turn a request into a single generated image.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &GenerationRequest) -> Result<GenerationResult, GeminiError>;
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 && s.is_ascii() {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => arr.iter_mut().for_each(truncate_base64_in_json),
        _ => {}
    }
}

fn loggable<T: Serialize>(body: &T) -> String {
    match serde_json::to_value(body) {
        Ok(mut value) => {
            truncate_base64_in_json(&mut value);
            serde_json::to_string(&value).unwrap_or_default()
        }
        Err(_) => String::new(),
    }
}

/// The instruction text sent next to the two images. The model photo is
/// always attached first, the product second.
pub fn compose_instruction(brief: &str, style: Style, aspect_ratio: AspectRatio) -> String {
    format!(
        "You are a professional product photographer. The first image shows a model and the second image shows a product. \
        Create a single new photograph of the model naturally wearing, holding or using the product, keeping the model's \
        identity and the product's design, colours and details faithful to the originals. \
        Creative brief: {brief}. \
        Style: {} ({}). \
        Aspect ratio: {}. \
        Return only the final image.",
        style.name(),
        style.scene(),
        aspect_ratio.as_str(),
        brief = brief.trim(),
    )
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: impl Into<String>, config: &Config) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.image_model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn perform_api_call(&self, body: &GeminiRequest) -> Result<GeminiResponse, GeminiError> {
        let url = self.endpoint();
        info!("🔗 Making request to: {}", url);
        info!("📤 Request body: {}", loggable(body));

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::Network(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await.map_err(|e| GeminiError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(GeminiError::Service { status: status.as_u16(), body: response_text });
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&response_text).map_err(|e| GeminiError::Parse(e.to_string()))?;
        info!("📥 Gemini response: {}", loggable(&parsed));
        Ok(parsed)
    }
}

#[async_trait]
impl Synthesizer for GeminiClient {
    async fn synthesize(&self, request: &GenerationRequest) -> Result<GenerationResult, GeminiError> {
        info!("🎯 Generating {} / {} image with Gemini model {}", request.style(), request.aspect_ratio(), self.model);
        let body = GeminiRequest::from_generation_request(request);
        let parsed = self.perform_api_call(&body).await?;
        let image = extract_first_image(&parsed)?;
        info!("✅ Received {} image ({} chars)", image.content_type, image.data.len());
        Ok(GenerationResult::new(image))
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    candidate_count: Option<u32>,
}

impl GeminiRequest {
    fn from_generation_request(request: &GenerationRequest) -> Self {
        let parts = vec![
            Part::inline(request.model()),
            Part::inline(request.product()),
            Part::Text { text: compose_instruction(request.brief(), request.style(), request.aspect_ratio()) },
        ];
        Self {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                candidate_count: Some(1),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
    Other(serde_json::Value),
}

impl Part {
    fn inline(asset: &EncodedAsset) -> Self {
        Part::Inline { inline_data: InlineData { mime_type: asset.content_type.clone(), data: asset.data.clone() } }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

fn extract_first_image(resp: &GeminiResponse) -> Result<EncodedAsset, GeminiError> {
    for c in &resp.candidates {
        for p in &c.content.parts {
            if let Part::Inline { inline_data } = p {
                if inline_data.data.is_empty() {
                    continue;
                }
                info!("🎯 Found image data with mime type: {}", inline_data.mime_type);
                return Ok(EncodedAsset { content_type: inline_data.mime_type.clone(), data: inline_data.data.clone() });
            }
        }
    }

    // Best available explanation: a block reason, a finish reason, or whatever text the model sent back.
    let reason = resp
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
        .or_else(|| {
            resp.candidates.iter().flat_map(|c| &c.content.parts).find_map(|p| match p {
                Part::Text { text } if !text.trim().is_empty() => Some(text.trim().to_string()),
                _ => None,
            })
        })
        .or_else(|| resp.candidates.iter().find_map(|c| c.finish_reason.clone()));
    warn!("⚠️ No inline image data found in response structure (reason: {:?})", reason);
    Err(GeminiError::NoImageReturned { reason })
}
