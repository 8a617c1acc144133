//! # contract: seams between the pipeline and its collaborators
//!
//! The scrape pipeline never talks to the network, the message bus or the metrics
//! backend directly. It goes through the traits in this module:
//!
//! - [`Transport`]: sends one HTTP request and returns the full response. One
//!   transport instance owns one cookie jar, so every account gets its own.
//! - [`TransportFactory`]: opens a fresh transport per account run.
//! - [`Publisher`]: hands a serialized entity to the bus under a topic.
//! - [`Metrics`]: counts stage outcomes and records gauges.
//!
//! All traits are annotated for `mockall` so tests can drive the pipeline with
//! canned pages (mocks are exported behind the default `test-export-mocks` feature).

use std::time::Duration;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{ScrapeResult, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Ordered `application/x-www-form-urlencoded` fields.
///
/// Order is kept as inserted and duplicate names are allowed, which is what the
/// stateful login and tab forms expect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBody {
    fields: Vec<(String, String)>,
}

impl FormBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn extend<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.fields.extend(fields);
    }

    /// First value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn encode(&self) -> String {
        self.fields
            .iter()
            .map(|(n, v)| format!("{}={}", urlencoding::encode(n), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl FromIterator<(String, String)> for FormBody {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Form(FormBody),
    Raw { content_type: String, data: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
    pub body: Body,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            basic_auth: None,
            body: Body::Empty,
            timeout: None,
        }
    }

    pub fn post_form(url: impl Into<String>, form: FormBody) -> Self {
        Self {
            method: Method::Post,
            body: Body::Form(form),
            ..Self::get(url)
        }
    }

    pub fn post_raw(
        url: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            method: Method::Post,
            body: Body::Raw {
                content_type: content_type.into(),
                data: data.into(),
            },
            ..Self::get(url)
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Form fields of a form-encoded request, if any.
    pub fn form(&self) -> Option<&FormBody> {
        match &self.body {
            Body::Form(form) => Some(form),
            _ => None,
        }
    }
}

/// Raw response: status, headers, final URL after redirects, and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Convenience constructor for a `200 OK` response, mostly for fixtures.
    pub fn ok(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            url: url.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a single HTTP request. Implementations keep cookie state between calls.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> ScrapeResult<HttpResponse>;
}

/// Opens an independent transport (and cookie jar) for one account run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait TransportFactory: Send + Sync {
    fn open(&self) -> ScrapeResult<Box<dyn Transport>>;
}

/// Hands a serialized entity to the message bus.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> ScrapeResult<()>;
}

/// Result of one pipeline stage, as counted by [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure(&'static str),
}

impl Outcome {
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure(_) => "failure",
        }
    }
}

/// Counter and gauge sink.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Metrics: Send + Sync {
    fn record(&self, domain: &str, topic: &str, stage: Stage, outcome: Outcome);

    fn gauge(&self, name: &str, topic: &str, value: f64);
}
