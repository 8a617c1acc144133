//! Session establishment against sites without a real API.
//!
//! [`establish`] performs the login dance described by an [`AuthShape`] and returns a
//! [`Session`]: the account's transport (and with it the cookie jar) plus an optional
//! ticket header. Every shape ends with an explicit success check; a login that
//! "went through" without the expected ticket or marker is an authentication error.

use std::fmt;
use std::sync::Mutex;

use reqwest::Url;
use tracing::{debug, error, info, warn};

use crate::contract::{FormBody, HttpRequest, HttpResponse, Transport};
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::markup::hidden_fields;
use crate::sites::{AuthShape, FormAuth, JsonDashboardAuth, TicketAuth};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated transport context for one account against one site.
pub struct Session<'t> {
    transport: &'t dyn Transport,
    ticket: Option<(String, String)>,
    /// Page the login already loaded, keyed by the URL it was requested from.
    landing: Mutex<Option<(String, HttpResponse)>>,
}

impl<'t> Session<'t> {
    /// A session relying on cookies only.
    pub fn cookies(transport: &'t dyn Transport) -> Self {
        Self {
            transport,
            ticket: None,
            landing: Mutex::new(None),
        }
    }

    pub fn with_ticket(
        transport: &'t dyn Transport,
        header: impl Into<String>,
        ticket: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            ticket: Some((header.into(), ticket.into())),
            landing: Mutex::new(None),
        }
    }

    /// Keeps `page`, loaded from `url` during login, for the first fetch of `url`.
    pub fn with_landing(self, url: impl Into<String>, page: HttpResponse) -> Self {
        Self {
            landing: Mutex::new(Some((url.into(), page))),
            ..self
        }
    }

    /// Hands out the login's landing page once, if it was loaded from `url`.
    pub fn take_landing(&self, url: &str) -> Option<HttpResponse> {
        let mut landing = self.landing.lock().unwrap_or_else(|p| p.into_inner());
        if matches!(landing.as_ref(), Some((loaded_from, _)) if loaded_from == url) {
            landing.take().map(|(_, page)| page)
        } else {
            None
        }
    }

    pub fn ticket(&self) -> Option<&str> {
        self.ticket.as_ref().map(|(_, t)| t.as_str())
    }

    /// Sends `request` with the ticket attached. Non-success statuses are transport errors.
    pub async fn send(&self, mut request: HttpRequest) -> ScrapeResult<HttpResponse> {
        if let Some((header, ticket)) = &self.ticket {
            request.headers.push((header.clone(), ticket.clone()));
        }
        let url = request.url.clone();
        let resp = self.transport.send(request).await?;
        if !resp.is_success() {
            error!(status = resp.status, url = %url, "Request returned non-success status");
            return Err(ScrapeError::Transport(format!(
                "{url} returned status {}",
                resp.status
            )));
        }
        Ok(resp)
    }
}

/// Logs in with `credentials` as described by `auth`.
pub async fn establish<'t>(
    transport: &'t dyn Transport,
    credentials: &Credentials,
    auth: &AuthShape,
) -> ScrapeResult<Session<'t>> {
    let result = match auth {
        AuthShape::Ticket(t) => ticket_login(transport, credentials, t).await,
        AuthShape::Form(f) => form_login(transport, credentials, f).await,
        AuthShape::JsonDashboard(j) => json_dashboard_login(transport, credentials, j).await,
    };
    match &result {
        Ok(_) => info!(username = %credentials.username, "Session established"),
        Err(e) => warn!(username = %credentials.username, error = %e, "Session could not be established"),
    }
    result
}

async fn ticket_login<'t>(
    transport: &'t dyn Transport,
    credentials: &Credentials,
    auth: &TicketAuth,
) -> ScrapeResult<Session<'t>> {
    let request = HttpRequest::get(auth.login_url)
        .basic_auth(&credentials.username, &credentials.password)
        .timeout(auth.timeout);
    let resp = transport.send(request).await?;
    if !resp.is_success() {
        return Err(ScrapeError::Authentication(format!(
            "ticket login rejected with status {}",
            resp.status
        )));
    }
    let ticket = resp
        .header(auth.ticket_header)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ScrapeError::Authentication(format!("no {} header in login response", auth.ticket_header))
        })?;
    debug!(header = auth.ticket_header, "Received session ticket");
    Ok(Session::with_ticket(transport, auth.ticket_header, ticket))
}

/// Resolves a form action relative to the page it was found on.
fn resolve_action(page_url: &str, action: &str) -> ScrapeResult<String> {
    let base = Url::parse(page_url)
        .map_err(|e| ScrapeError::Parse(format!("invalid page url {page_url:?}: {e}")))?;
    base.join(action)
        .map(|u| u.to_string())
        .map_err(|e| ScrapeError::Parse(format!("invalid form action {action:?}: {e}")))
}

/// Builds the login POST body: every discovered hidden field, then the credentials.
pub fn login_form(hidden: &FormBody, auth: &FormAuth, credentials: &Credentials) -> FormBody {
    let mut form = hidden.clone();
    form.push(auth.username_field, credentials.username.as_str());
    form.push(auth.password_field, credentials.password.as_str());
    form
}

fn require_marker(page: &HttpResponse, marker: &str) -> ScrapeResult<()> {
    if page.body.contains(marker) {
        Ok(())
    } else {
        Err(ScrapeError::Authentication(format!(
            "marker {marker:?} not found on {}",
            page.url
        )))
    }
}

async fn form_login<'t>(
    transport: &'t dyn Transport,
    credentials: &Credentials,
    auth: &FormAuth,
) -> ScrapeResult<Session<'t>> {
    for url in auth.warmup_urls {
        let resp = transport.send(HttpRequest::get(*url)).await?;
        debug!(url, status = resp.status, "Warm-up request done");
    }

    let login_page = transport.send(HttpRequest::get(auth.login_url)).await?;
    if !login_page.is_success() {
        return Err(ScrapeError::Transport(format!(
            "login page {} returned status {}",
            auth.login_url, login_page.status
        )));
    }

    let snapshot = hidden_fields(&login_page.body, auth.form_selector)?;
    let action = match (&snapshot.action, auth.fallback_action) {
        (Some(action), _) => resolve_action(&login_page.url, action)?,
        (None, Some(fallback)) => fallback.to_string(),
        (None, None) => login_page.url.clone(),
    };
    let form = login_form(&snapshot.hidden, auth, credentials);
    debug!(action = %action, fields = form.len(), "Submitting login form");

    let mut request = HttpRequest::post_form(&action, form).header("Referer", &login_page.url);
    for (name, value) in auth.extra_headers {
        request = request.header(*name, *value);
    }
    let mut page = transport.send(request).await?;
    if !page.is_success() {
        return Err(ScrapeError::Authentication(format!(
            "login form rejected with status {}",
            page.status
        )));
    }

    if let Some(relay_url) = auth.relay_url {
        let relay = hidden_fields(&page.body, auth.form_selector)?;
        let target = match &relay.action {
            Some(action) => resolve_action(&page.url, action)?,
            None => relay_url.to_string(),
        };
        debug!(target = %target, fields = relay.hidden.len(), "Relaying token form");
        page = transport
            .send(HttpRequest::post_form(&target, relay.hidden).header("Referer", &page.url))
            .await?;
        if !page.is_success() {
            return Err(ScrapeError::Authentication(format!(
                "token relay rejected with status {}",
                page.status
            )));
        }
    }

    require_marker(&page, auth.marker)?;
    Ok(Session::cookies(transport))
}

/// Substitutes credentials into a JSON body template as quoted JSON strings.
pub fn render_json_login(template: &str, credentials: &Credentials) -> ScrapeResult<String> {
    let quote = |s: &str| {
        serde_json::to_string(s)
            .map_err(|e| ScrapeError::Authentication(format!("cannot encode credentials: {e}")))
    };
    Ok(template
        .replace("{username}", &quote(&credentials.username)?)
        .replace("{password}", &quote(&credentials.password)?))
}

async fn json_dashboard_login<'t>(
    transport: &'t dyn Transport,
    credentials: &Credentials,
    auth: &JsonDashboardAuth,
) -> ScrapeResult<Session<'t>> {
    let body = render_json_login(auth.body_template, credentials)?;
    let resp = transport
        .send(HttpRequest::post_raw(auth.login_url, auth.content_type, body))
        .await?;
    if !resp.is_success() {
        return Err(ScrapeError::Authentication(format!(
            "login attempt rejected with status {}",
            resp.status
        )));
    }

    let dashboard = transport.send(HttpRequest::get(auth.dashboard_url)).await?;
    if !dashboard.is_success() {
        return Err(ScrapeError::Transport(format!(
            "dashboard {} returned status {}",
            auth.dashboard_url, dashboard.status
        )));
    }
    require_marker(&dashboard, auth.marker)?;
    Ok(Session::cookies(transport).with_landing(auth.dashboard_url, dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("anna", "hunter2");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("anna"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn json_login_escapes_credentials() {
        let body = render_json_login(
            r#"{"userName":{username},"password":{password}}"#,
            &Credentials::new("a\"b", "p\\w"),
        )
        .unwrap();
        let v: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["userName"], "a\"b");
        assert_eq!(v["password"], "p\\w");
    }

    #[test]
    fn landing_page_is_handed_out_once_for_its_url() {
        let transport = crate::contract::MockTransport::new();
        let page = HttpResponse::ok("https://example.se/kort", "<html>kort</html>");
        let session = Session::cookies(&transport).with_landing("https://example.se/kort", page.clone());

        assert_eq!(session.take_landing("https://example.se/annat"), None);
        assert_eq!(session.take_landing("https://example.se/kort"), Some(page));
        assert_eq!(session.take_landing("https://example.se/kort"), None);
    }

    #[test]
    fn actions_resolve_against_page() {
        assert_eq!(
            resolve_action("https://example.se/web/arena/welcome", "login?x=1").unwrap(),
            "https://example.se/web/arena/login?x=1"
        );
        assert_eq!(
            resolve_action("https://example.se/a/b", "https://other.se/c").unwrap(),
            "https://other.se/c"
        );
    }
}
