use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::contract::{Body, HttpRequest, HttpResponse, Method, Transport, TransportFactory};
use crate::error::{ScrapeError, ScrapeResult};

const USER_AGENT: &str = concat!("homescrape/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed transport. Each instance owns its own cookie store.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> ScrapeResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build HTTP client");
                ScrapeError::Transport(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ScrapeResult<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Form(form) => builder
                .header(
                    reqwest::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(form.encode()),
            Body::Raw { content_type, data } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data),
        };

        let resp = builder.send().await.map_err(|e| {
            error!(error = ?e, url = %request.url, "HTTP request failed");
            ScrapeError::from(e)
        })?;

        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.text().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to read response body");
            ScrapeError::from(e)
        })?;
        debug!(status, url = %url, bytes = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            url,
            headers,
            body,
        })
    }
}

/// Builds a fresh [`ReqwestTransport`] for every account run.
pub struct ReqwestTransportFactory {
    pub timeout: Duration,
}

impl Default for ReqwestTransportFactory {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportFactory for ReqwestTransportFactory {
    fn open(&self) -> ScrapeResult<Box<dyn Transport>> {
        Ok(Box::new(ReqwestTransport::new(self.timeout)?))
    }
}
