//! HTTP(S) transfer over reqwest

use super::traits::{Fetched, Transfer};
use crate::error::Error;
use crate::types::{FileDescriptor, Stage};
use async_trait::async_trait;

/// Fetches descriptor links with a shared `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct HttpTransfer {
    client: reqwest::Client,
}

impl HttpTransfer {
    /// Transfer with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Transfer using a preconfigured client (proxies, TLS roots, headers)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn fetch(&self, descriptor: &FileDescriptor) -> crate::Result<Fetched> {
        tracing::debug!(link = %descriptor.link, "fetching");

        let response = self.client.get(&descriptor.link).send().await?;

        if !response.status().is_success() {
            return Err(Error::stage(
                Stage::Download,
                &descriptor.path,
                format!("HTTP {} from {}", response.status(), descriptor.link),
            ));
        }

        let reported_length = response.content_length();
        let bytes = response.bytes().await?.to_vec();

        tracing::debug!(
            link = %descriptor.link,
            bytes = bytes.len(),
            ?reported_length,
            "fetched"
        );

        Ok(Fetched {
            bytes,
            reported_length,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_body_and_reported_length() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/system/l2.ini"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"[Engine]\n".to_vec()))
            .mount(&mock_server)
            .await;

        let descriptor = FileDescriptor::new(
            "l2.ini",
            format!("{}/system/l2.ini", mock_server.uri()),
            "system/l2.ini",
        );
        let fetched = HttpTransfer::new().fetch(&descriptor).await.unwrap();

        assert_eq!(fetched.bytes, b"[Engine]\n");
        assert_eq!(fetched.reported_length, Some(9));
    }

    #[tokio::test]
    async fn http_error_status_is_download_stage_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.dat"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let descriptor = FileDescriptor::new(
            "missing",
            format!("{}/missing.dat", mock_server.uri()),
            "missing.dat",
        );
        let result = HttpTransfer::new().fetch(&descriptor).await;

        match result {
            Err(Error::Stage { stage, path, reason }) => {
                assert_eq!(stage, Stage::Download);
                assert_eq!(path, "missing.dat");
                assert!(reason.contains("404"), "reason should carry status, got: {reason}");
            }
            other => panic!("expected Stage error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let descriptor = FileDescriptor::new("x", "http://127.0.0.1:1/x.dat", "x.dat");
        let result = HttpTransfer::new().fetch(&descriptor).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
