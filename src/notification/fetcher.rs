//! Document retrieval.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Retrieves the HTML of a published document.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch `url`, giving up once `deadline` has passed.
    ///
    /// The deadline is derived from the start of the pipeline run, not from
    /// the moment this call is made.
    async fn fetch(&self, url: &str, deadline: Instant) -> Result<Vec<u8>, FetchError>;
}

/// HTTP fetcher backed by `reqwest`.
///
/// The response status is logged but not acted on: any response that
/// arrives in time is handed to the extractor.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, deadline: Instant) -> Result<Vec<u8>, FetchError> {
        let started = Instant::now();
        let request = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if status.is_success() {
                tracing::debug!(url = %url, status = %status.as_u16(), "Fetched document");
            } else {
                tracing::warn!(url = %url, status = %status.as_u16(), "Document fetched with non-success status");
            }
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(body.to_vec())
        };

        match tokio::time::timeout_at(deadline, request).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(source)) => Err(FetchError::Transport {
                url: url.to_string(),
                source,
            }),
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                budget: deadline.saturating_duration_since(started),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve `app` on an ephemeral local port, returning its base URL.
    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_unparseable_url() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(3);

        let err = fetcher.fetch("anysource", deadline).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_non_success_body_is_returned_with_user_agent() {
        // Echo the User-Agent into an article link so both can be checked
        let app = Router::new().route(
            "/post",
            get(|headers: HeaderMap| async move {
                let agent = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                (
                    StatusCode::NOT_FOUND,
                    format!(r#"<article><a href="https://target.example">{}</a></article>"#, agent),
                )
            }),
        );
        let base = serve(app).await;

        let config = FetchConfig {
            user_agent: "dispatcher-test/1.0".to_string(),
            ..FetchConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let deadline = Instant::now() + Duration::from_secs(3);

        let body = fetcher
            .fetch(&format!("{}/post", base), deadline)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"<article><a href="https://target.example">dispatcher-test/1.0</a></article>"#
        );
    }

    #[tokio::test]
    async fn test_stalled_body_hits_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            // Headers promise more body than is ever sent
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n<article>")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let started = Instant::now();
        let deadline = started + Duration::from_millis(200);

        let err = fetcher
            .fetch(&format!("http://{}/slow", addr), deadline)
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            FetchError::Timeout { budget, .. } => assert!(budget <= Duration::from_millis(200)),
            other => panic!("unexpected error: {}", other),
        }
    }
}
