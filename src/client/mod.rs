//! HTTP client for probing a running server

use reqwest::Client;
use serde_json::Value;

use crate::config::{normalize_base_url, Config};

/// Thin client around the server's `/health` endpoint
#[derive(Clone)]
pub struct HealthClient {
    client: Client,
    base_url: String,
}

impl HealthClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: normalize_base_url(base_url),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base_url}/health`, returning the parsed JSON body
    pub async fn health_check(&self) -> Result<Value, HealthError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(HealthError::Request)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                format!("Request failed with status {}", status)
            } else {
                body
            };
            return Err(HealthError::Api { status, message });
        }

        response.json().await.map_err(HealthError::Parse)
    }
}

/// Health check errors
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn parses_healthy_response() {
        let router = Router::new().route(
            "/health",
            get(|| async { axum::Json(serde_json::json!({ "status": "ok" })) }),
        );
        let client = HealthClient::new(&serve(router).await);
        assert!(!client.base_url().ends_with('/'));

        let body = client.health_check().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn error_carries_response_text() {
        let router = Router::new().route(
            "/health",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "database warming up") }),
        );
        let client = HealthClient::new(&serve(router).await);

        match client.health_check().await {
            Err(HealthError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "database warming up");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_error_body_falls_back_to_status() {
        let router = Router::new().route("/health", get(|| async { StatusCode::BAD_GATEWAY }));
        let client = HealthClient::new(&serve(router).await);

        let err = client.health_check().await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 502");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_error() {
        // port 9 (discard) is closed on test hosts
        let client = HealthClient::new("http://127.0.0.1:9");
        assert!(matches!(
            client.health_check().await,
            Err(HealthError::Request(_))
        ));
    }
}
