// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Upper bound on the buffer reserved from `Content-Length`.
const MAX_PREALLOC: u64 = 64 << 20;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &CrawlerConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Send a GET and fail on any non-200 status.
async fn get_ok(client: &Client, url: &str, timeout: Option<Duration>) -> Result<Response> {
    let mut request = client.get(url);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(AppError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Fetch a body as text.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    Ok(get_ok(client, url, None).await?.text().await?)
}

/// Buffer size to reserve for a body of the advertised length.
fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.unwrap_or(0).min(MAX_PREALLOC) as usize
}

/// Download a body chunk by chunk into memory.
pub async fn fetch_bytes(client: &Client, url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let mut response = get_ok(client, url, Some(timeout)).await?;
    let mut buffer = Vec::with_capacity(initial_capacity(response.content_length()));
    while let Some(chunk) = response.chunk().await? {
        buffer.extend_from_slice(&chunk);
    }
    log::debug!("Downloaded {} bytes from {}", buffer.len(), url);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_initial_capacity_ignores_oversized_length() {
        assert_eq!(initial_capacity(None), 0);
        assert_eq!(initial_capacity(Some(1024)), 1024);
        assert_eq!(initial_capacity(Some(u64::MAX)), (64 << 20) as usize);
    }

    #[tokio::test]
    async fn test_fetch_bytes_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let client = Client::new();
        let body = fetch_bytes(&client, &format!("{}/feed", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body.len(), 4096);

        let err = fetch_text(&client, &format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Status { status: 404, .. }));
    }
}
