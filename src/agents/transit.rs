use async_trait::async_trait;
use chrono::Local;
use tracing::{debug, info};

use super::{epoch_seconds, Agent, AgentOutput, RunContext};
use crate::config::AccountConfig;
use crate::contract::Transport;
use crate::domain::transit::{self, TransitFragments};
use crate::error::{AccountError, ScrapeResult, Stage};
use crate::extract::markup::flatten_text;
use crate::extract::text::{date_window, sum_integer_matches, timestamp};
use crate::fetch::{fetch, fetch_tab};
use crate::session::establish;
use crate::sites::transit::{ostgotatrafiken, TransitSite};

pub struct TransitAgent {
    site: TransitSite,
}

impl TransitAgent {
    pub fn new(site: TransitSite) -> Self {
        Self { site }
    }
}

impl Default for TransitAgent {
    fn default() -> Self {
        Self::new(ostgotatrafiken())
    }
}

/// Reads balance, pass window and freshness from a card overview page.
pub fn parse_card(site: &TransitSite, page: &str) -> ScrapeResult<TransitFragments> {
    // Partial page updates wrap their markup in CDATA sections.
    let unwrapped = page.replace("<![CDATA[", "").replace("]]>", "");
    let text = flatten_text(&unwrapped);
    debug!(chars = text.len(), "Flattened card overview");

    Ok(TransitFragments {
        amount: sum_integer_matches(&text, site.cash_pattern)?,
        pass_window: date_window(&text, site.pass_window_pattern)?,
        card_updated: timestamp(&text, site.card_updated_pattern)?,
    })
}

#[async_trait]
impl Agent for TransitAgent {
    fn domain(&self) -> &'static str {
        "transit"
    }

    fn topic(&self, account: &AccountConfig) -> String {
        account.topic(self.site.topic_prefix)
    }

    async fn run(&self, transport: &dyn Transport, ctx: &RunContext<'_>) -> Result<AgentOutput, AccountError> {
        let credentials = ctx.account.credentials();
        let session = ctx.check(Stage::Login, establish(transport, &credentials, &self.site.auth).await)?;

        let page = match ctx.account.tab.as_deref() {
            Some(label) => fetch_tab(&session, &self.site.card_overview, &self.site.tabs, label).await,
            None => fetch(&session, &self.site.card_overview).await,
        };
        let page = ctx.check(Stage::Fetch, page)?;

        let fragments = ctx.check(Stage::Parse, parse_card(&self.site, &page.body))?;
        let card = ctx.check(
            Stage::Assemble,
            transit::assemble(&ctx.account.name, fragments, Local::now()),
        )?;

        let mut output = AgentOutput::default();
        ctx.check(Stage::Assemble, output.push_json(ctx.topic.clone(), &card))?;
        output.gauge("transit_amount", card.amount as f64);
        if let (Some(start), Some(end)) = (&card.pass_start, &card.pass_end) {
            output.gauge("transit_pass_start", epoch_seconds(start));
            output.gauge("transit_pass_end", epoch_seconds(end));
        }

        info!(
            topic = %ctx.topic,
            amount = card.amount,
            has_pass = card.has_pass(),
            "Transit card assembled"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use chrono::{Datelike, Timelike};

    #[test]
    fn reads_cash_window_and_freshness() {
        let page = r#"<html><body>
            <div>Reskassa: <b>230 kr</b></div>
            <div>Period Fr&#229;n 2023-01-01 Till 2023-01-31</div>
            <div>(Senast uppdaterat 2023-01-15 08:42)</div>
        </body></html>"#;
        let fragments = parse_card(&ostgotatrafiken(), page).unwrap();
        assert_eq!(fragments.amount, 230);
        let (start, end) = fragments.pass_window.unwrap();
        assert_eq!((start.year(), start.month(), start.day()), (2023, 1, 1));
        assert_eq!((end.year(), end.month(), end.day()), (2023, 1, 31));
        let updated = fragments.card_updated.unwrap();
        assert_eq!((updated.hour(), updated.minute()), (8, 42));
    }

    #[test]
    fn partial_update_markup_is_unwrapped() {
        let page = r#"<partial-response><changes><update id="form1"><![CDATA[<div>Saldo 40 kr</div>]]></update></changes></partial-response>"#;
        let fragments = parse_card(&ostgotatrafiken(), page).unwrap();
        assert_eq!(fragments.amount, 40);
        assert_eq!(fragments.pass_window, None);
    }

    #[test]
    fn missing_balance_is_parse_error() {
        let err = parse_card(&ostgotatrafiken(), "<p>Inget kort</p>").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }
}
