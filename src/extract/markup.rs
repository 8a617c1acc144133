//! Structural extraction over parsed HTML.
//!
//! `scraper::Html` is not `Send`, so every function here parses and drops the
//! document inside a synchronous call and hands back owned values. Async callers
//! never hold a parsed document across an `.await`.

use chrono::{DateTime, Local};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{date_pattern, parse_ymd};
use crate::contract::FormBody;
use crate::error::{ScrapeError, ScrapeResult};

/// How candidate values for a single field are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Stop at the first candidate that parses.
    First,
    /// Add every non-empty candidate; any unparseable candidate is an error.
    Sum,
}

pub fn selector(css: &str) -> ScrapeResult<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Parse(format!("invalid selector {css:?}: {e:?}")))
}

/// Concatenated text of an element and its descendants.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Concatenated text of every descendant of `el` matching `sel`.
pub fn text_within(el: ElementRef<'_>, sel: &Selector) -> String {
    el.select(sel).map(element_text).collect::<String>()
}

/// All text nodes of the page joined into one stream, script bodies included.
pub fn flatten_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let text = doc.root_element().text().collect::<String>();
    text
}

/// Hidden inputs and action of a login form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    pub action: Option<String>,
    pub hidden: FormBody,
}

/// Discovers every hidden input inside the first element matching `form_selector`.
///
/// Falls back to the whole document when no such form is rendered. Field names are
/// taken as found; inputs without a name are skipped and a missing value is sent empty.
pub fn hidden_fields(html: &str, form_selector: &str) -> ScrapeResult<FormSnapshot> {
    let doc = Html::parse_document(html);
    let form_sel = selector(form_selector)?;
    let input_sel = selector("input")?;

    let form = doc.select(&form_sel).next();
    let scope = form.unwrap_or_else(|| doc.root_element());
    if form.is_none() {
        debug!(form_selector, "Form not found, collecting hidden inputs from whole page");
    }

    let mut hidden = FormBody::new();
    for input in scope.select(&input_sel) {
        let attrs = input.value();
        let is_hidden = attrs
            .attr("type")
            .map(|t| t.eq_ignore_ascii_case("hidden"))
            .unwrap_or(false);
        if !is_hidden {
            continue;
        }
        let Some(name) = attrs.attr("name") else {
            continue;
        };
        hidden.push(name, attrs.attr("value").unwrap_or_default());
    }
    let action = form
        .and_then(|f| f.value().attr("action"))
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    debug!(fields = hidden.len(), has_action = action.is_some(), "Discovered hidden form fields");
    Ok(FormSnapshot { action, hidden })
}

/// Every input under `scope_selector` carrying both a name and a value, in document order.
pub fn named_inputs(html: &str, scope_selector: &str) -> ScrapeResult<FormBody> {
    let doc = Html::parse_document(html);
    let scope_sel = selector(scope_selector)?;
    let input_sel = selector("input")?;

    let mut fields = FormBody::new();
    for scope in doc.select(&scope_sel) {
        for input in scope.select(&input_sel) {
            let attrs = input.value();
            if let (Some(name), Some(value)) = (attrs.attr("name"), attrs.attr("value")) {
                fields.push(name, value);
            }
        }
    }
    Ok(fields)
}

/// Id of the first `item_selector` element under `container_selector` whose trimmed
/// visible text equals `label`.
pub fn labelled_id(
    html: &str,
    container_selector: &str,
    item_selector: &str,
    label: &str,
) -> ScrapeResult<Option<String>> {
    let doc = Html::parse_document(html);
    let container_sel = selector(container_selector)?;
    let item_sel = selector(item_selector)?;

    let found = doc
        .select(&container_sel)
        .flat_map(|c| c.select(&item_sel))
        .find(|item| element_text(*item).trim() == label)
        .and_then(|item| item.value().id().map(str::to_string));
    Ok(found)
}

/// Labels of every `item_selector` element under `container_selector`, for diagnostics.
pub fn labels(html: &str, container_selector: &str, item_selector: &str) -> ScrapeResult<Vec<String>> {
    let doc = Html::parse_document(html);
    let container_sel = selector(container_selector)?;
    let item_sel = selector(item_selector)?;
    let labels = doc
        .select(&container_sel)
        .flat_map(|c| c.select(&item_sel))
        .map(|item| element_text(item).trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    Ok(labels)
}

/// Parses a Swedish amount such as `"1 234,50 kr"`.
///
/// Drops the `kr` suffix and all whitespace (including non-breaking spaces) and
/// turns the decimal comma into a period.
pub fn parse_decimal(text: &str) -> ScrapeResult<f64> {
    let cleaned = text
        .replace("kr", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .replace(',', ".");
    if cleaned.is_empty() {
        return Err(ScrapeError::Parse(format!("no amount in {text:?}")));
    }
    cleaned
        .parse::<f64>()
        .map_err(|e| ScrapeError::Parse(format!("invalid amount {text:?}: {e}")))
}

/// Finds the first `YYYY-MM-DD` in `text` and returns it as local midnight,
/// ignoring whatever time or label text surrounds it.
pub fn date_in(text: &str) -> ScrapeResult<DateTime<Local>> {
    let m = date_pattern()
        .find(text)
        .ok_or_else(|| ScrapeError::Parse(format!("no YYYY-MM-DD date in {:?}", text.trim())))?;
    parse_ymd(m.as_str())
}

/// Like [`date_in`] but treats text without a date as absent.
pub fn optional_date_in(text: &str) -> ScrapeResult<Option<DateTime<Local>>> {
    match date_pattern().find(text) {
        Some(m) => parse_ymd(m.as_str()).map(Some),
        None => Ok(None),
    }
}

/// Removes every `YYYY-MM-DD` from `text` and trims the rest.
pub fn strip_dates(text: &str) -> String {
    date_pattern().replace_all(text, "").trim().to_string()
}

/// Every non-empty amount under `css`, in document order.
///
/// A candidate that does not parse is an error: a fee that cannot be read must not
/// silently drop out of a total.
pub fn amounts(html: &str, css: &str) -> ScrapeResult<Vec<f64>> {
    let doc = Html::parse_document(html);
    let sel = selector(css)?;
    let mut values = Vec::new();
    for el in doc.select(&sel) {
        let raw = element_text(el);
        if raw.trim().is_empty() {
            continue;
        }
        values.push(parse_decimal(&raw)?);
    }
    Ok(values)
}

/// Reads an amount from the elements matching `css`.
///
/// Returns `None` when no candidate carried a value at all.
pub fn amount(html: &str, css: &str, aggregation: Aggregation) -> ScrapeResult<Option<f64>> {
    if aggregation == Aggregation::Sum {
        let values = amounts(html, css)?;
        return Ok((!values.is_empty()).then(|| values.iter().sum()));
    }

    let doc = Html::parse_document(html);
    let sel = selector(css)?;
    for el in doc.select(&sel) {
        let raw = element_text(el);
        if raw.trim().is_empty() {
            continue;
        }
        match parse_decimal(&raw) {
            Ok(v) => return Ok(Some(v)),
            Err(e) => warn!(selector = css, error = %e, "Skipping unparseable amount candidate"),
        }
    }
    Ok(None)
}
