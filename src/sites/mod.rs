//! Declarative site descriptors.
//!
//! Everything that is coupled to a particular version of a third-party page lives
//! here: endpoints, login form field names, CSS selectors, regex patterns and
//! marker strings. The agents only interpret these values, so when a site changes
//! its markup the fix is a descriptor edit.

pub mod grocery;
pub mod library;
pub mod transit;

use std::time::Duration;

/// A named logical resource and the URL serving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub name: &'static str,
    pub url: &'static str,
}

/// Basic credentials exchanged for a ticket returned in a response header.
#[derive(Debug, Clone, Copy)]
pub struct TicketAuth {
    pub login_url: &'static str,
    /// Response header carrying the ticket, re-sent under the same name.
    pub ticket_header: &'static str,
    pub timeout: Duration,
}

/// Classic HTML form login with anti-forgery tokens discovered from the page.
#[derive(Debug, Clone, Copy)]
pub struct FormAuth {
    /// Pages fetched first only to pick up cookies.
    pub warmup_urls: &'static [&'static str],
    pub login_url: &'static str,
    pub form_selector: &'static str,
    /// Used when the rendered form has no `action`.
    pub fallback_action: Option<&'static str>,
    pub username_field: &'static str,
    pub password_field: &'static str,
    pub extra_headers: &'static [(&'static str, &'static str)],
    /// When set, the hidden fields of the page returned by the login POST are
    /// submitted again (to the form's action, or this URL when it has none).
    pub relay_url: Option<&'static str>,
    /// Text that only an authenticated page contains.
    pub marker: &'static str,
}

/// JSON login attempt followed by a stateful dashboard page.
#[derive(Debug, Clone, Copy)]
pub struct JsonDashboardAuth {
    pub login_url: &'static str,
    pub content_type: &'static str,
    /// Body with `{username}` and `{password}` placeholders, substituted as JSON strings.
    pub body_template: &'static str,
    pub dashboard_url: &'static str,
    pub marker: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum AuthShape {
    Ticket(TicketAuth),
    Form(FormAuth),
    JsonDashboard(JsonDashboardAuth),
}

/// Where the tabs of a stateful page live and how a click on one is replayed.
#[derive(Debug, Clone, Copy)]
pub struct TabSelector {
    /// Scope whose inputs form the opaque interaction payload.
    pub payload_scope: &'static str,
    pub container: &'static str,
    pub item: &'static str,
    /// Appended to the tab element id to form the event target id.
    pub target_suffix: &'static str,
    /// Fields whose value is the event target id. The target id itself is also
    /// submitted as a field named after itself.
    pub target_fields: &'static [&'static str],
    /// Fixed interaction metadata (click coordinates, modifier flags, submit mode).
    pub click_fields: &'static [(&'static str, &'static str)],
}
