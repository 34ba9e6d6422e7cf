//! HTTP transport: `GET target?params`, JSON response bodies.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{AbortSignal, Transport};
use crate::{HuginnError, RequestSpec, Result};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body quoted in a `Status` error.
const MAX_ERROR_BODY: usize = 512;

/// [`Transport`] that issues `GET` requests with reqwest and decodes the
/// body as JSON into `T`.
///
/// `RequestSpec::target` is the URL; `RequestSpec::params` become the query
/// string. Connection failures and timeouts map to
/// [`HuginnError::Http`], non-2xx responses to [`HuginnError::Status`].
pub struct HttpTransport<T> {
    http: Client,
    headers: Vec<(String, String)>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> HttpTransport<T> {
    /// Transport with a 30 second request timeout and a `huginn/<version>`
    /// user agent.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Transport with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| HuginnError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http))
    }

    /// Transport over an existing reqwest client.
    pub fn with_client(http: Client) -> Self {
        Self {
            http,
            headers: Vec::new(),
            _payload: PhantomData,
        }
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    async fn send(&self, spec: &RequestSpec) -> Result<String> {
        let mut request = self.http.get(&spec.target).query(&spec.params);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                truncate(body.trim(), MAX_ERROR_BODY)
            };
            return Err(HuginnError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl<T> Transport<T> for HttpTransport<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn request(&self, spec: &RequestSpec, signal: &AbortSignal) -> Result<T> {
        let body = tokio::select! {
            biased;
            _ = signal.aborted() => return Err(HuginnError::Aborted),
            body = self.send(spec) => body?,
        };
        Ok(serde_json::from_str(&body)?)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_untouched() {
        assert_eq!(truncate("boom", 10), "boom");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "équipement";
        let t = truncate(s, 1);
        assert_eq!(t, "…");
        let t = truncate(s, 2);
        assert_eq!(t, "é…");
    }
}
