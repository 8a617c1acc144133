//! Resource fetcher: named, authenticated requests and tab selection on stateful pages.

use tracing::{debug, info, warn};

use crate::contract::{FormBody, HttpRequest, HttpResponse};
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::markup::{labelled_id, labels, named_inputs};
use crate::session::Session;
use crate::sites::{Resource, TabSelector};

/// GETs a named resource under `session`, reusing the login's landing page when it is
/// the same URL.
pub async fn fetch(session: &Session<'_>, resource: &Resource) -> ScrapeResult<HttpResponse> {
    if let Some(page) = session.take_landing(resource.url) {
        debug!(resource = resource.name, "Reusing page loaded during login");
        return Ok(page);
    }
    debug!(resource = resource.name, url = resource.url, "Fetching resource");
    let resp = session.send(HttpRequest::get(resource.url)).await?;
    info!(resource = resource.name, bytes = resp.body.len(), "Fetched resource");
    Ok(resp)
}

/// View-state fields captured from a rendered page and replayed verbatim.
///
/// The exact field set belongs to the site's UI framework; nothing here interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionPayload(FormBody);

impl InteractionPayload {
    pub fn fields(&self) -> &FormBody {
        &self.0
    }
}

/// Locates the tab labelled `label` and builds the click replay for it.
pub fn tab_click(html: &str, tabs: &TabSelector, label: &str) -> ScrapeResult<FormBody> {
    let payload = InteractionPayload(named_inputs(html, tabs.payload_scope)?);
    let Some(tab_id) = labelled_id(html, tabs.container, tabs.item, label)? else {
        let available = labels(html, tabs.container, tabs.item)?;
        warn!(tab = label, ?available, "Requested tab not rendered");
        return Err(ScrapeError::ResourceNotFound(format!(
            "tab {label:?} not found among {available:?}"
        )));
    };
    let target = format!("{tab_id}{}", tabs.target_suffix);

    let mut form = payload.0;
    form.push(target.as_str(), target.as_str());
    for field in tabs.target_fields {
        form.push(*field, target.as_str());
    }
    for (name, value) in tabs.click_fields {
        form.push(*name, *value);
    }
    Ok(form)
}

/// Fetches `view` and then the content of its tab labelled `label`.
///
/// Fails with [`ScrapeError::ResourceNotFound`] instead of falling back to the
/// default tab when the label is not rendered.
pub async fn fetch_tab(
    session: &Session<'_>,
    view: &Resource,
    tabs: &TabSelector,
    label: &str,
) -> ScrapeResult<HttpResponse> {
    let page = fetch(session, view).await?;
    let form = tab_click(&page.body, tabs, label)?;
    debug!(resource = view.name, tab = label, fields = form.len(), "Selecting tab");
    let resp = session
        .send(HttpRequest::post_form(view.url, form).header("Referer", &page.url))
        .await?;
    info!(resource = view.name, tab = label, bytes = resp.body.len(), "Fetched tab");
    Ok(resp)
}
