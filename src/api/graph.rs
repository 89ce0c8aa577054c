use serde::Deserialize;

use super::{endpoint, ApiClient, ApiError};

pub const DEFAULT_API_URL: &str = "https://graph.facebook.com/v18.0";

/// Client for the two-step media publish flow: create a container, then publish it.
#[derive(Debug, Clone)]
pub struct GraphClient {
    inner: ApiClient,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(default)]
    id: Option<String>,
}

impl GraphClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            inner: ApiClient::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    async fn post_for_id(&self, path: &str, form: &[(&str, &str)]) -> Result<String, ApiError> {
        let url = endpoint(&self.base_url, path);
        let request = self.inner.post(&url).form(form);
        let response: IdResponse = self.inner.send(&url, request).await?;

        response
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse {
                url,
                reason: "response has no `id`".to_string(),
            })
    }

    /// Stage an image for publishing, returning the container id.
    pub async fn create_container(&self, image_url: &str, caption: &str) -> Result<String, ApiError> {
        self.post_for_id(
            "me/media",
            &[
                ("image_url", image_url),
                ("caption", caption),
                ("access_token", self.token.as_str()),
            ],
        )
        .await
    }

    /// Publish a staged container, returning the id of the new media.
    pub async fn publish_container(&self, creation_id: &str) -> Result<String, ApiError> {
        self.post_for_id(
            "me/media_publish",
            &[("creation_id", creation_id), ("access_token", self.token.as_str())],
        )
        .await
    }
}
