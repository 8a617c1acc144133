use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitCard {
    pub name: String,
    #[serde(rename = "cardstart")]
    pub pass_start: Option<DateTime<Local>>,
    #[serde(rename = "cardend")]
    pub pass_end: Option<DateTime<Local>>,
    /// Stored cash in whole kronor.
    pub amount: i64,
    pub updated: DateTime<Local>,
    /// When the operator last synced the card, as printed on the page.
    pub card_updated: Option<DateTime<Local>>,
}

impl TransitCard {
    pub fn has_pass(&self) -> bool {
        self.pass_start.is_some() && self.pass_end.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitFragments {
    pub amount: i64,
    pub pass_window: Option<(DateTime<Local>, DateTime<Local>)>,
    pub card_updated: Option<DateTime<Local>>,
}

pub fn assemble(
    name: &str,
    fragments: TransitFragments,
    now: DateTime<Local>,
) -> ScrapeResult<TransitCard> {
    let (pass_start, pass_end) = match fragments.pass_window {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };
    Ok(TransitCard {
        name: name.to_string(),
        pass_start,
        pass_end,
        amount: fragments.amount,
        updated: now,
        card_updated: fragments.card_updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parse_ymd;

    #[test]
    fn no_window_means_no_pass() {
        let card = assemble(
            "Buss",
            TransitFragments {
                amount: 40,
                pass_window: None,
                card_updated: None,
            },
            Local::now(),
        )
        .unwrap();
        assert!(!card.has_pass());
        let json = serde_json::to_value(&card).unwrap();
        assert!(json["cardstart"].is_null());
        assert_eq!(json["amount"], 40);
    }

    #[test]
    fn window_is_split() {
        let start = parse_ymd("2023-01-01").unwrap();
        let end = parse_ymd("2023-01-31").unwrap();
        let card = assemble(
            "Buss",
            TransitFragments {
                amount: 0,
                pass_window: Some((start, end)),
                card_updated: None,
            },
            Local::now(),
        )
        .unwrap();
        assert_eq!(card.pass_start, Some(start));
        assert_eq!(card.pass_end, Some(end));
    }
}
