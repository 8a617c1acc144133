use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{ScrapeError, ScrapeResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    pub date: DateTime<Local>,
    pub location: String,
    pub discount: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceSource {
    Feed,
    Html,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroceryAccount {
    pub name: String,
    pub available: f64,
    pub transactions: Vec<Transaction>,
    pub source: BalanceSource,
    pub updated: DateTime<Local>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroceryFragments {
    pub feed_available: Option<f64>,
    pub html_available: Option<f64>,
    pub transactions: Vec<Transaction>,
}

/// Whether the web dashboard has to be consulted for this feed balance.
///
/// The feed occasionally reports exactly zero for a funded account; that value is
/// not trusted.
pub fn needs_dashboard(feed_available: Option<f64>) -> bool {
    match feed_available {
        Some(v) => v == 0.0,
        None => true,
    }
}

pub fn assemble(
    name: &str,
    fragments: GroceryFragments,
    now: DateTime<Local>,
) -> ScrapeResult<GroceryAccount> {
    let (available, source) = match (fragments.feed_available, fragments.html_available) {
        (Some(feed), Some(html)) if feed == 0.0 => (html, BalanceSource::Html),
        (Some(feed), _) => (feed, BalanceSource::Feed),
        (None, Some(html)) => (html, BalanceSource::Html),
        (None, None) => {
            return Err(ScrapeError::Assembly(
                "no available balance from feed or dashboard".to_string(),
            ))
        }
    };
    Ok(GroceryAccount {
        name: name.to_string(),
        available,
        transactions: fragments.transactions,
        source,
        updated: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments(feed: Option<f64>, html: Option<f64>) -> GroceryFragments {
        GroceryFragments {
            feed_available: feed,
            html_available: html,
            transactions: vec![],
        }
    }

    #[test]
    fn html_supersedes_zero_feed() {
        let a = assemble("Hem", fragments(Some(0.0), Some(245.5)), Local::now()).unwrap();
        assert_eq!(a.available, 245.5);
        assert_eq!(a.source, BalanceSource::Html);
    }

    #[test]
    fn non_zero_feed_wins() {
        let a = assemble("Hem", fragments(Some(100.0), Some(245.5)), Local::now()).unwrap();
        assert_eq!(a.available, 100.0);
        assert_eq!(a.source, BalanceSource::Feed);
    }

    #[test]
    fn zero_feed_without_dashboard_stays_zero() {
        let a = assemble("Hem", fragments(Some(0.0), None), Local::now()).unwrap();
        assert_eq!(a.available, 0.0);
        assert_eq!(a.source, BalanceSource::Feed);
    }

    #[test]
    fn missing_balance_is_assembly_error() {
        let err = assemble("Hem", fragments(None, None), Local::now()).unwrap_err();
        assert!(matches!(err, ScrapeError::Assembly(_)));
    }

    #[test]
    fn dashboard_needed_only_for_zero_or_missing() {
        assert!(needs_dashboard(None));
        assert!(needs_dashboard(Some(0.0)));
        assert!(!needs_dashboard(Some(0.5)));
    }

    #[test]
    fn json_keys_are_pascal_case() {
        let a = assemble("Hem", fragments(Some(10.0), None), Local::now()).unwrap();
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["Available"], 10.0);
        assert_eq!(v["Source"], "feed");
        assert!(v["Transactions"].is_array());
    }

    #[test]
    fn published_json_parses_back_to_the_same_account() {
        let mut f = fragments(Some(0.0), Some(245.5));
        f.transactions.push(Transaction {
            date: Local::now(),
            location: "ICA Kvantum".into(),
            discount: 0.1 + 0.2,
            amount: 412.7,
        });
        let account = assemble("Hem", f, Local::now()).unwrap();

        let json = serde_json::to_string(&account).unwrap();
        let reparsed: GroceryAccount = serde_json::from_str(&json).unwrap();
        assert_eq!(account, reparsed);
    }
}
