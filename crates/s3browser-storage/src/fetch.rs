//! Remote downloads for fetch jobs.

use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::debug;

use s3browser_core::config::StorageConfig;
use s3browser_core::error::AppError;
use s3browser_core::result::AppResult;

/// HTTP client used to download the source of a fetch job.
///
/// Only a `200 OK` response counts as a successful download. The whole
/// body is buffered so the upload that follows has a known length.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
}

impl RemoteFetcher {
    /// Build a fetcher with the given request timeout.
    pub fn new(timeout: Duration, skip_tls_verify: bool) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(skip_tls_verify)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Build a fetcher from the storage configuration.
    pub fn from_config(config: &StorageConfig) -> AppResult<Self> {
        Self::new(config.fetch_timeout(), config.skip_tls_verify)
    }

    /// Download `url` into memory.
    pub async fn download(&self, url: &str) -> AppResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::external_service(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::external_service(format!(
                "GET {url} returned {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            AppError::external_service(format!("Failed to read body of {url}: {e}"))
        })?;
        debug!(url, bytes = body.len(), "Remote file downloaded");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3browser_core::error::ErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> RemoteFetcher {
        RemoteFetcher::new(Duration::from_secs(5), false).unwrap()
    }

    #[tokio::test]
    async fn test_download_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/report.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher()
            .download(&format!("{}/files/report.pdf", server.uri()))
            .await
            .unwrap();
        assert_eq!(&body[..], b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_non_ok_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .download(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
        assert!(err.message.contains("404"));
    }

    #[tokio::test]
    async fn test_other_success_codes_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let err = fetcher()
            .download(&format!("{}/empty", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }

    #[tokio::test]
    async fn test_timeout_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = RemoteFetcher::new(Duration::from_millis(100), false).unwrap();
        let err = fetcher
            .download(&format!("{}/slow", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }
}
