use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::clients::traits::{LanguageModel, LlmError};
use crate::config::ModelConfig;

const ERROR_BODY_CAP_CHARS: usize = 500;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Client for the Gemini `generateContent` REST endpoint
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    retries: u32,
}

impl GeminiClient {
    pub fn new(api_key: String, config: &ModelConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build reqwest client with timeout")?;
        Ok(Self {
            client,
            api_key,
            model: config.name.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            retries: config.retries.max(1),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        tracing::debug!(
            "Calling Gemini (model={}, prompt_chars={})",
            self.model,
            prompt.len()
        );

        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        // Retry with simple exponential backoff
        let mut last_err: Option<LlmError> = None;
        for i in 0..self.retries {
            if i > 0 {
                let delay_ms = 200u64 * (1u64 << (i - 1));
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            let response = match self
                .client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_err = Some(LlmError::Request(e.to_string()));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let error_text = response.text().await.unwrap_or_default();
                last_err = Some(LlmError::Api {
                    status,
                    body: truncate_chars(error_text.trim(), ERROR_BODY_CAP_CHARS),
                });
                continue;
            }

            match response.json::<GenerateResponse>().await {
                Ok(parsed) => {
                    return match parsed.text() {
                        Some(text) => Ok(text),
                        None => {
                            let reason = parsed
                                .candidates
                                .first()
                                .and_then(|c| c.finish_reason.clone())
                                .unwrap_or_else(|| "none".to_string());
                            tracing::warn!("Gemini returned no text (finish_reason={})", reason);
                            Err(LlmError::EmptyResponse)
                        }
                    };
                }
                Err(e) => {
                    last_err = Some(LlmError::ParseError(e.to_string()));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| LlmError::Request("no attempts made".to_string())))
    }
}

fn truncate_chars(input: &str, max: usize) -> String {
    let mut out = String::new();
    for (idx, ch) in input.chars().enumerate() {
        if idx >= max {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "1. IDENTIFICATION:"}, {"text": "\n   Program: HELLO"}]},
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            resp.text().as_deref(),
            Some("1. IDENTIFICATION:\n   Program: HELLO")
        );
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let resp: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(resp.text().is_none());
    }

    #[test]
    fn test_blank_text_is_treated_as_empty() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": "  \n"}]}, "finishReason": "MAX_TOKENS"}]}"#;
        let resp: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.text().is_none());
    }

    #[test]
    fn test_endpoint_uses_model_name() {
        let config = ModelConfig {
            api_base: "http://localhost:9999/v1beta/".into(),
            ..ModelConfig::default()
        };
        let client = GeminiClient::new("k".into(), &config).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
