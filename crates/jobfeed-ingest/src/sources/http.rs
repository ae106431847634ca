//! HTTP fetching shared by all sources

use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// Default per-request timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; JobFeed/1.0)";

/// Client settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Content negotiation for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// No Accept header
    Any,
    /// `Accept: application/json`
    Json,
}

/// GET-only client that maps failures onto [`IngestError`]
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    /// Fetch `url` and return the body as text
    ///
    /// Connection failures, timeouts and body read errors become
    /// [`IngestError::Network`]; non-2xx statuses are classified by
    /// [`IngestError::from_status`].
    pub async fn fetch(&self, url: &str, accept: Accept) -> Result<String> {
        let mut request = self.client.get(url);
        if accept == Accept::Json {
            request = request.header(header::ACCEPT, "application/json");
        }

        let response = request.send().await.map_err(|e| network_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let err = IngestError::from_status(url, status);
            if matches!(err, IngestError::RateLimited { .. }) {
                warn!(url, "Rate limited by upstream");
            }
            return Err(err);
        }

        let body = response.text().await.map_err(|e| network_error(url, &e))?;
        debug!(url, status = status.as_u16(), bytes = body.len(), "Fetched payload");

        Ok(body)
    }
}

fn network_error(url: &str, err: &reqwest::Error) -> IngestError {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };

    IngestError::Network {
        url: url.to_string(),
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&HttpSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_json_fetch_sends_accept_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(header_eq("accept", "application/json"))
            .and(header_eq("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch(&format!("{}/api", server.uri()), Accept::Json)
            .await
            .unwrap();
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_error_statuses_are_classified() {
        let server = MockServer::start().await;
        Mock::given(path("/limited"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = fetcher();
        let limited = fetcher
            .fetch(&format!("{}/limited", server.uri()), Accept::Json)
            .await
            .unwrap_err();
        assert!(matches!(limited, IngestError::RateLimited { .. }));

        let broken = fetcher
            .fetch(&format!("{}/broken", server.uri()), Accept::Any)
            .await
            .unwrap_err();
        assert!(matches!(broken, IngestError::Server { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let err = fetcher()
            .fetch("http://127.0.0.1:9/feed", Accept::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Network { .. }));
    }
}
