use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::debug;

use crate::normalize::{Citation, RawUpstreamResponse};

/// Binary input sent alongside the prompt (image, PDF...).
#[derive(Debug, Clone)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Client for a Gemini-style `generateContent` endpoint.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    pub fn from_env() -> Result<Self> {
        let api_key = dotenv::var("GEMINI_API_KEY").context("GEMINI_API_KEY required")?;
        let base_url = dotenv::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());
        let model =
            dotenv::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        Self::new(base_url, model, api_key)
    }

    pub fn new(base_url: String, model: String, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve the generateContent endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with(":generateContent") {
            base.to_string()
        } else {
            format!("{}/models/{}:generateContent", base, self.model)
        }
    }

    /// Free text plus grounding citations, with web retrieval enabled.
    pub async fn generate_grounded(
        &self,
        prompt: &str,
        attachments: &[Attachment],
    ) -> Result<RawUpstreamResponse> {
        let body = serde_json::json!({
            "contents": contents(prompt, attachments),
            "tools": [{ "google_search": {} }],
        });
        let json = self.generate(&body).await?;
        let response = RawUpstreamResponse {
            body: candidate_text(&json)?,
            citations: grounding_citations(&json),
        };
        debug!(
            body_len = response.body.len(),
            citations = response.citations.len(),
            "grounded response received"
        );
        Ok(response)
    }

    /// JSON validated against `schema` by the upstream service. No retrieval.
    pub async fn generate_structured(
        &self,
        prompt: &str,
        attachments: &[Attachment],
        schema: Value,
    ) -> Result<Value> {
        let body = serde_json::json!({
            "contents": contents(prompt, attachments),
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });
        let json = self.generate(&body).await?;
        let text = candidate_text(&json)?;
        debug!(text_len = text.len(), "structured response received");
        serde_json::from_str(&text).context("Structured response is not valid JSON")
    }

    async fn generate(&self, body: &Value) -> Result<Value> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .context("LLM request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read LLM response")?;
        if !status.is_success() {
            let snippet: String = text.chars().take(500).collect();
            bail!("LLM returned {}: {}", status, snippet);
        }
        serde_json::from_str(&text).context("Failed to parse LLM JSON")
    }
}

fn contents(prompt: &str, attachments: &[Attachment]) -> Value {
    let mut parts = vec![serde_json::json!({ "text": prompt })];
    for attachment in attachments {
        parts.push(serde_json::json!({
            "inline_data": {
                "mime_type": attachment.mime_type,
                "data": STANDARD.encode(&attachment.data),
            }
        }));
    }
    serde_json::json!([{ "role": "user", "parts": parts }])
}

/// Concatenate the text parts of the first candidate.
/// A prompt rejected by the service is an error; an empty answer is not.
fn candidate_text(json: &Value) -> Result<String> {
    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        bail!("LLM blocked the prompt: {}", reason);
    }
    let text = json["candidates"]
        .get(0)
        .and_then(|c| c["content"]["parts"].as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    Ok(text)
}

/// Grounding sources of the first candidate. Entries missing a `uri` or
/// `title` are discarded; a repeated `uri` keeps its first occurrence.
pub fn grounding_citations(json: &Value) -> Vec<Citation> {
    let Some(chunks) = json["candidates"]
        .get(0)
        .and_then(|c| c["groundingMetadata"]["groundingChunks"].as_array())
    else {
        return vec![];
    };

    let mut seen = HashSet::new();
    chunks
        .iter()
        .filter_map(|chunk| {
            let web = &chunk["web"];
            let uri = web["uri"].as_str().map(str::trim).filter(|s| !s.is_empty())?;
            let title = web["title"].as_str().map(str::trim).filter(|s| !s.is_empty())?;
            Some(Citation {
                uri: uri.to_string(),
                title: title.to_string(),
            })
        })
        .filter(|c| seen.insert(c.uri.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> LlmClient {
        LlmClient::new(base.to_string(), "gemini-test".to_string(), "key".to_string()).unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client("https://api.test/v1beta/").endpoint(),
            "https://api.test/v1beta/models/gemini-test:generateContent"
        );
        assert_eq!(
            client("https://proxy.test/models/x:generateContent").endpoint(),
            "https://proxy.test/models/x:generateContent"
        );
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let json = json!({
            "candidates": [{ "content": { "parts": [{ "text": "--- RESULT ---\n" }, { "text": "title: A" }] } }]
        });
        assert_eq!(candidate_text(&json).unwrap(), "--- RESULT ---\ntitle: A");
        assert_eq!(candidate_text(&json!({})).unwrap(), "");
    }

    #[test]
    fn test_blocked_prompt_is_error() {
        let json = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(candidate_text(&json).is_err());
    }

    #[test]
    fn test_grounding_citations_filtered() {
        let json = json!({
            "candidates": [{
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://a.test", "title": "A" } },
                        { "web": { "uri": "https://b.test" } },
                        { "web": { "title": "no uri" } },
                        { "retrievedContext": { "uri": "x" } },
                        { "web": { "uri": "https://a.test", "title": "A again" } },
                        { "web": { "uri": "https://c.test", "title": "C" } }
                    ]
                }
            }]
        });
        let citations = grounding_citations(&json);
        let uris: Vec<_> = citations.iter().map(|c| c.uri.as_str()).collect();
        assert_eq!(uris, ["https://a.test", "https://c.test"]);
        assert_eq!(citations[0].title, "A");
    }

    #[test]
    fn test_no_grounding_metadata() {
        assert!(grounding_citations(&json!({ "candidates": [{}] })).is_empty());
    }

    #[test]
    fn test_attachments_base64() {
        let parts = contents(
            "p",
            &[Attachment {
                mime_type: "image/png".to_string(),
                data: b"hi".to_vec(),
            }],
        );
        assert_eq!(parts[0]["parts"][1]["inline_data"]["data"], "aGk=");
        assert_eq!(parts[0]["parts"][0]["text"], "p");
    }
}
