use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Agent, AgentOutput, RunContext};
use crate::config::AccountConfig;
use crate::contract::{Outcome, Transport};
use crate::domain::grocery::{self, needs_dashboard, GroceryFragments, Transaction};
use crate::error::{AccountError, ScrapeError, ScrapeResult, Stage};
use crate::extract::markup::{amount, date_in};
use crate::fetch::fetch;
use crate::session::{establish, Credentials};
use crate::sites::grocery::{ica, GroceryDashboard, GrocerySite, TransactionFields};

pub struct GroceryAgent {
    site: GrocerySite,
}

impl GroceryAgent {
    pub fn new(site: GrocerySite) -> Self {
        Self { site }
    }
}

impl Default for GroceryAgent {
    fn default() -> Self {
        Self::new(ica())
    }
}

fn parse_json(body: &str, what: &str) -> ScrapeResult<Value> {
    serde_json::from_str(body).map_err(|e| ScrapeError::Parse(format!("{what} is not JSON: {e}")))
}

/// Available balance from the first pointer that resolves to a number.
pub fn feed_available(body: &str, pointers: &[&str]) -> ScrapeResult<Option<f64>> {
    let doc = parse_json(body, "account feed")?;
    let found = pointers
        .iter()
        .find_map(|p| doc.pointer(p).and_then(Value::as_f64));
    debug!(available = ?found, "Read feed balance");
    Ok(found)
}

fn number_field(item: &Value, field: &str) -> ScrapeResult<f64> {
    item.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| ScrapeError::Parse(format!("transaction lacks numeric {field}")))
}

/// Transaction ledger at `pointer`; a missing ledger is an empty one.
pub fn feed_transactions(body: &str, pointer: &str, fields: &TransactionFields) -> ScrapeResult<Vec<Transaction>> {
    let doc = parse_json(body, "transaction feed")?;
    let Some(items) = doc.pointer(pointer).and_then(Value::as_array) else {
        warn!(pointer, "No transaction list in feed");
        return Ok(Vec::new());
    };

    items
        .iter()
        .map(|item| -> ScrapeResult<Transaction> {
            let date = item
                .get(fields.date)
                .and_then(Value::as_str)
                .ok_or_else(|| ScrapeError::Parse(format!("transaction lacks {}", fields.date)))?;
            Ok(Transaction {
                date: date_in(date)?,
                location: item
                    .get(fields.location)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                discount: item.get(fields.discount).and_then(Value::as_f64).unwrap_or(0.0),
                amount: number_field(item, fields.amount)?,
            })
        })
        .collect()
}

impl GroceryAgent {
    /// Balance read from the web dashboard, in a session of its own.
    async fn dashboard_balance(
        &self,
        transport: &dyn Transport,
        credentials: &Credentials,
        dashboard: &GroceryDashboard,
    ) -> Result<Option<f64>, (Stage, ScrapeError)> {
        let session = establish(transport, credentials, &dashboard.auth)
            .await
            .map_err(|e| (Stage::Login, e))?;
        let page = fetch(&session, &dashboard.balance_resource)
            .await
            .map_err(|e| (Stage::Fetch, e))?;
        amount(&page.body, dashboard.balance_selector, dashboard.aggregation).map_err(|e| (Stage::Parse, e))
    }
}

#[async_trait]
impl Agent for GroceryAgent {
    fn domain(&self) -> &'static str {
        "grocery"
    }

    fn topic(&self, account: &AccountConfig) -> String {
        account.topic(self.site.topic_prefix)
    }

    async fn run(&self, transport: &dyn Transport, ctx: &RunContext<'_>) -> Result<AgentOutput, AccountError> {
        let feed = &self.site.feed;
        let credentials = ctx.account.credentials();
        let session = ctx.check(Stage::Login, establish(transport, &credentials, &feed.auth).await)?;

        let account_page = ctx.check(Stage::Fetch, fetch(&session, &feed.account_resource).await)?;
        let transactions_page = ctx.check(Stage::Fetch, fetch(&session, &feed.transactions_resource).await)?;

        let feed_balance = ctx.check(
            Stage::Parse,
            feed_available(&account_page.body, feed.available_pointers),
        )?;
        let transactions = ctx.check(
            Stage::Parse,
            feed_transactions(&transactions_page.body, feed.transactions_pointer, &feed.transaction_fields),
        )?;

        let html_balance = if needs_dashboard(feed_balance) {
            info!(topic = %ctx.topic, feed = ?feed_balance, "Feed balance missing or zero, reading dashboard");
            match self.dashboard_balance(transport, &credentials, &self.site.dashboard).await {
                Ok(balance) => balance,
                Err((stage, e)) => {
                    warn!(topic = %ctx.topic, stage = %stage, error = %e, "Dashboard balance unavailable");
                    ctx.metrics.record(ctx.domain, &ctx.topic, stage, Outcome::Failure(e.kind()));
                    None
                }
            }
        } else {
            None
        };

        let account = ctx.check(
            Stage::Assemble,
            grocery::assemble(
                &ctx.account.name,
                GroceryFragments {
                    feed_available: feed_balance,
                    html_available: html_balance,
                    transactions,
                },
                Local::now(),
            ),
        )?;

        let mut output = AgentOutput::default();
        ctx.check(Stage::Assemble, output.push_json(ctx.topic.clone(), &account))?;
        output.push_raw(
            format!("{}/available", ctx.topic),
            (account.available.trunc() as i64).to_string(),
        );
        output.gauge("grocery_available", account.available);

        info!(
            topic = %ctx.topic,
            available = account.available,
            source = ?account.source,
            transactions = account.transactions.len(),
            "Grocery account assembled"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_tries_pointers_in_order() {
        let site = ica();
        let nested = r#"{"Cards":[{"Accounts":[{"Available":312.5}]}]}"#;
        assert_eq!(feed_available(nested, site.feed.available_pointers).unwrap(), Some(312.5));
        let flat = r#"{"AvailableAmount":0,"Cards":[{"Accounts":[{"Available":312.5}]}]}"#;
        assert_eq!(feed_available(flat, site.feed.available_pointers).unwrap(), Some(0.0));
        assert_eq!(feed_available("{}", site.feed.available_pointers).unwrap(), None);
        assert!(feed_available("<html>", site.feed.available_pointers).is_err());
    }

    #[test]
    fn transactions_map_feed_fields() {
        let site = ica();
        let body = r#"{"Transactions":[
            {"TransactionDate":"2017-01-23T00:00:00","LocationName":" ICA Kvantum ","Discount":5.5,"TransactionValue":-120.0},
            {"TransactionDate":"2017-01-20T00:00:00","LocationName":"ICA Nära","TransactionValue":45}
        ]}"#;
        let txs = feed_transactions(body, site.feed.transactions_pointer, &site.feed.transaction_fields).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].location, "ICA Kvantum");
        assert_eq!(txs[0].discount, 5.5);
        assert_eq!(txs[0].amount, -120.0);
        assert_eq!(txs[1].discount, 0.0);
    }

    #[test]
    fn transaction_without_amount_is_parse_error() {
        let site = ica();
        let body = r#"{"Transactions":[{"TransactionDate":"2017-01-23T00:00:00"}]}"#;
        let err = feed_transactions(body, site.feed.transactions_pointer, &site.feed.transaction_fields).unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }
}
