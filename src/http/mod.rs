//! HTTP step execution
//!
//! One blocking round trip per step: send the request, read the full
//! response body, hand back status + text. No retries, no implicit total
//! timeout; the connect timeout configured at construction is the only
//! transport bound.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Url};

use crate::common::{Error, Result};

/// Status code and full body text of one completed request
#[derive(Debug, Clone)]
pub struct HttpExchange {
    pub status: u16,
    pub body: String,
}

impl HttpExchange {
    /// True for 2xx responses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues requests against a fixed base URL
pub struct HttpExecutor {
    client: Client,
    base_url: String,
}

impl HttpExecutor {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        Url::parse(base_url).map_err(|_| Error::InvalidBaseUrl(base_url.to_string()))?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(Error::ClientBuild)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one request/response round trip
    ///
    /// A transport-level failure (connection refused, I/O error) surfaces
    /// as `Error::Transport`, never as a fabricated exchange; the caller
    /// decides what to skip. Any received status, including 4xx/5xx, is a
    /// successful exchange from the transport's point of view.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        headers: &[(String, String)],
        body: Option<&str>,
    ) -> Result<HttpExchange> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.request(method, &url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let response = request.send().await.map_err(|source| Error::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| Error::Transport { url, source })?;

        Ok(HttpExchange { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_base_url() {
        let result = HttpExecutor::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(Error::InvalidBaseUrl(_))));
    }

    #[test]
    fn trims_trailing_slash() {
        let executor =
            HttpExecutor::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(executor.base_url(), "http://localhost:8080");
    }

    #[test]
    fn success_range_is_2xx() {
        let ok = HttpExchange { status: 201, body: String::new() };
        let conflict = HttpExchange { status: 409, body: String::new() };
        assert!(ok.is_success());
        assert!(!conflict.is_success());
    }
}
