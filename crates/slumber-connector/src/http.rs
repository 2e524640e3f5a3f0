//! HTTP client used to fetch remote JSON documents.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use slumber_core::{SlumberError, SlumberResult};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches JSON documents from remote Slumber services.
///
/// A 404 answer is reported as [`SlumberError::NotFound`]; other non-success
/// statuses as [`SlumberError::RemoteStatus`]; connection problems as
/// [`SlumberError::Transport`]. No retries are attempted.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GETs `url` and parses the body as JSON.
    async fn get_json(&self, url: &Url) -> SlumberResult<Value>;
}

/// `reqwest`-backed [`HttpClient`].
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> SlumberResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SlumberError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get_json(&self, url: &Url) -> SlumberResult<Value> {
        debug!(url = %url, "HTTP GET");

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SlumberError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_http_error(url, status));
        }

        // Servers answer with text/plain, so parse the body ourselves.
        let body = response
            .text()
            .await
            .map_err(|e| SlumberError::transport(url, e))?;
        serde_json::from_str(&body)
            .map_err(|e| SlumberError::malformed(format!("{url} did not return JSON: {e}")))
    }
}

fn map_http_error(url: &Url, status: StatusCode) -> SlumberError {
    match status {
        StatusCode::NOT_FOUND => SlumberError::not_found("remote resource", url),
        _ => SlumberError::RemoteStatus {
            url: url.to_string(),
            status: status.as_u16(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> ReqwestHttpClient {
        ReqwestHttpClient::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_json_parses_text_plain_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slumber/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"_meta": {"status": 200}}"#, "text/plain"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/slumber/", server.uri())).unwrap();
        let body = client().get_json(&url).await.unwrap();
        assert_eq!(body, json!({"_meta": {"status": 200}}));
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing/", server.uri())).unwrap();
        let err = client().get_json(&url).await.unwrap_err();
        assert!(matches!(err, SlumberError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/slumber/", server.uri())).unwrap();
        let err = client().get_json(&url).await.unwrap_err();
        assert!(matches!(err, SlumberError::RemoteStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let err = client().get_json(&url).await.unwrap_err();
        assert!(matches!(err, SlumberError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let url = Url::parse("http://127.0.0.1:9/slumber/").unwrap();
        let err = client().get_json(&url).await.unwrap_err();
        assert!(err.is_remote_failure());
    }
}
