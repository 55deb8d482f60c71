//! PDF document understanding through the Mistral OCR API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::cancel::CancelToken;
use crate::config::DocumentBackendConfig;
use crate::domain::DocumentPage;
use crate::error::ExtractError;
use crate::extract::http::{build_client, post_json, RetryPolicy};
use crate::extract::DocumentExtractor;

pub struct MistralOcr {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl MistralOcr {
    pub fn new(config: &DocumentBackendConfig, api_key: String) -> Result<Self, ExtractError> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    fn request_body(&self, bytes: &[u8]) -> Value {
        json!({
            "model": self.model,
            "document": {
                "type": "document_url",
                "document_url": format!("data:application/pdf;base64,{}", STANDARD.encode(bytes)),
            },
            "include_image_base64": false,
        })
    }
}

impl DocumentExtractor for MistralOcr {
    fn extract(
        &self,
        bytes: &[u8],
        cancel: &CancelToken,
    ) -> Result<Vec<DocumentPage>, ExtractError> {
        let auth = format!("Bearer {}", self.api_key);
        let response = post_json(
            &self.client,
            &self.endpoint,
            &[("Authorization", auth.as_str())],
            &self.request_body(bytes),
            &self.retry,
            cancel,
        )?;
        parse_ocr_response(&response)
    }
}

/// Extract `pages[].{index, markdown}` in response order.
fn parse_ocr_response(json: &Value) -> Result<Vec<DocumentPage>, ExtractError> {
    let pages = json
        .get("pages")
        .and_then(|p| p.as_array())
        .ok_or_else(|| ExtractError::InvalidResponse("missing pages array".into()))?;

    if pages.is_empty() {
        return Err(ExtractError::InvalidResponse("document has no pages".into()));
    }

    pages
        .iter()
        .enumerate()
        .map(|(position, page)| {
            let markdown = page
                .get("markdown")
                .and_then(|m| m.as_str())
                .ok_or_else(|| ExtractError::InvalidResponse("page without markdown".into()))?;
            let index = page
                .get("index")
                .and_then(|i| i.as_u64())
                .map(|i| i as usize)
                .unwrap_or(position);
            Ok(DocumentPage { index, markdown: markdown.to_string() })
        })
        .collect()
}
