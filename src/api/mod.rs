pub mod gemini;
pub mod graph;

use log::{debug, error, log_enabled, trace};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

/// Thin wrapper over [`reqwest::Client`] shared by the remote API clients.
///
/// Requests are sent once; a failed call is reported to the caller as is.
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        debug!("POST {}", url);
        self.client.post(url)
    }

    /// Send the request and decode a 2xx JSON body.
    pub async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if log_enabled!(log::Level::Trace) {
            trace!("{} {}", status, body);
        }

        if !status.is_success() {
            error!("API error ({}): {}", status, body);
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Join a base URL and a path without doubling the slash.
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        assert_eq!(
            endpoint("https://graph.facebook.com/v18.0/", "/me/media"),
            "https://graph.facebook.com/v18.0/me/media"
        );
        assert_eq!(endpoint("http://localhost:1234", "x"), "http://localhost:1234/x");
    }
}
