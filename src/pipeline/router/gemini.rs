//! Google generative-language adapter (`generateContent`).

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::http::{build_client, execute};
use super::types::{ProviderClient, ProviderRequest, RawProviderResponse};
use super::{ProviderError, RouterError};
use crate::models::{Provider, Role};

pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, RouterError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: build_client(Provider::Google, timeout_secs)?,
            timeout_secs,
        })
    }
}

impl ProviderClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn send(&self, request: &ProviderRequest<'_>) -> Result<RawProviderResponse, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = build_request(request);

        tracing::debug!(
            model = request.model,
            contents = body.contents.len(),
            has_image = request.image.is_some(),
            "Sending generateContent"
        );

        let builder = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response: GenerateContentResponse =
            execute(Provider::Google, &self.base_url, self.timeout_secs, builder)?;
        Ok(RawProviderResponse::GenerateContent(response))
    }
}

// ── Wire format ──

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptFeedback {
    #[serde(rename = "blockReason", default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    pub fn from_text(text: &str) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![ResponsePart {
                        text: Some(text.to_string()),
                    }],
                }),
                finish_reason: Some("STOP".into()),
            }],
            prompt_feedback: None,
        }
    }

    /// Text parts of the first candidate, concatenated.
    pub fn into_text(self) -> Result<String, ProviderError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::EmptyResponse {
                provider: Provider::Google,
                reason: match &block_reason {
                    Some(reason) => format!("prompt blocked ({reason})"),
                    None => "no candidates".into(),
                },
            }
        })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse {
                provider: Provider::Google,
                reason: format!(
                    "empty candidate (finishReason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            });
        }
        Ok(text)
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

/// History as `user`/`model` contents, then the prompt with an optional
/// inline image part.
pub fn build_request(request: &ProviderRequest<'_>) -> GenerateContentRequest {
    let mut contents: Vec<GeminiContent> = request
        .history
        .iter()
        .map(|turn| GeminiContent {
            role: Some(role_name(turn.role)),
            parts: vec![GeminiPart::Text {
                text: turn.content.clone(),
            }],
        })
        .collect();

    let mut parts = vec![GeminiPart::Text {
        text: request.prompt.to_string(),
    }];
    if let Some(image) = request.image {
        parts.push(GeminiPart::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.to_base64(),
            },
        });
    }
    contents.push(GeminiContent {
        role: Some("user"),
        parts,
    });

    GenerateContentRequest {
        contents,
        system_instruction: request.system.map(|s| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text {
                text: s.to_string(),
            }],
        }),
        generation_config: GenerationConfig {
            temperature: request.temperature,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversationTurn, ImageAttachment};

    fn request<'a>(
        history: &'a [ConversationTurn],
        image: Option<&'a ImageAttachment>,
    ) -> ProviderRequest<'a> {
        ProviderRequest {
            model: "gemini-pro",
            temperature: 0.7,
            system: None,
            history,
            prompt: "Describe",
            image,
        }
    }

    #[test]
    fn text_only_request_shape() {
        let json = serde_json::to_value(build_request(&request(&[], None))).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Describe");
        assert!(json.get("systemInstruction").is_none());
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn image_is_inline_base64_part() {
        let image = ImageAttachment::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg");
        let json = serde_json::to_value(build_request(&request(&[], Some(&image)))).unwrap();
        let part = &json["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(part["mime_type"], "image/jpeg");
        assert_eq!(part["data"], "/9j/");
    }

    #[test]
    fn history_uses_model_role_for_assistant() {
        let history = vec![ConversationTurn::user("q"), ConversationTurn::assistant("a")];
        let body = build_request(&request(&history, None));
        let roles: Vec<_> = body.contents.iter().map(|c| c.role).collect();
        assert_eq!(roles, vec![Some("user"), Some("model"), Some("user")]);
    }

    #[test]
    fn response_parts_are_concatenated() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), "Hello there");
    }

    #[test]
    fn blocked_prompt_is_empty_response_with_reason() {
        let json = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let err = response.into_text().unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn candidate_without_content_is_empty_response() {
        let json = r#"{"candidates":[{"finishReason":"RECITATION"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let err = response.into_text().unwrap_err();
        assert!(err.to_string().contains("RECITATION"));
    }
}
