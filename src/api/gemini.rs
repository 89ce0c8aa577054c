use serde::{Deserialize, Serialize};

use super::{endpoint, ApiClient, ApiError};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    inner: ApiClient,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: String },
}

#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    parts: &'a [Part],
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Debug, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug, Default)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            inner: ApiClient::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Run one `generateContent` call and return the text of the first candidate.
    pub async fn generate(&self, parts: &[Part]) -> Result<String, ApiError> {
        let url = endpoint(&self.base_url, &format!("models/{}:generateContent", self.model));
        let body = GenerateRequest {
            contents: [Content { parts }],
        };
        let request = self
            .inner
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response: GenerateResponse = self.inner.send(&url, request).await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ApiError::InvalidResponse {
                url,
                reason: "response has no text".to_string(),
            });
        }
        Ok(text)
    }
}
