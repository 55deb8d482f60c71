//! Image description through the Gemini `generateContent` API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::cancel::CancelToken;
use crate::config::VisionBackendConfig;
use crate::error::ExtractError;
use crate::extract::http::{build_client, post_json, RetryPolicy};
use crate::extract::ImageDescriber;

/// Instruction sent with every image.
pub const DESCRIBE_PROMPT: &str = "Describe this image in as much detail as possible. \
The description will be used to give other language models an understanding of the image, \
so include every relevant detail. Output only the description itself, with no preamble, \
commentary or conversation.";

pub struct GeminiVision {
    client: Client,
    api_key: String,
    url: String,
    retry: RetryPolicy,
}

impl GeminiVision {
    pub fn new(config: &VisionBackendConfig, api_key: String) -> Result<Self, ExtractError> {
        let url = format!(
            "{}/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            url,
            retry: RetryPolicy::new(config.max_retries),
        })
    }
}

impl ImageDescriber for GeminiVision {
    fn describe(
        &self,
        bytes: &[u8],
        media_type: &str,
        cancel: &CancelToken,
    ) -> Result<String, ExtractError> {
        let response = post_json(
            &self.client,
            &self.url,
            &[("x-goog-api-key", self.api_key.as_str())],
            &request_body(bytes, media_type),
            &self.retry,
            cancel,
        )?;
        parse_generate_response(&response)
    }
}

fn request_body(bytes: &[u8], media_type: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {"text": DESCRIBE_PROMPT},
                {"inline_data": {"mime_type": media_type, "data": STANDARD.encode(bytes)}}
            ]
        }]
    })
}

/// Concatenate the text parts of the first candidate.
fn parse_generate_response(json: &Value) -> Result<String, ExtractError> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| ExtractError::InvalidResponse("missing candidate content".into()))?;

    let text: String =
        parts.iter().filter_map(|p| p.get("text").and_then(|t| t.as_str())).collect();
    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractError::InvalidResponse("empty image description".into()));
    }
    Ok(text.to_string())
}
