use async_trait::async_trait;
use chrono::Local;
use scraper::Html;
use tracing::{debug, info};

use super::{epoch_seconds, Agent, AgentOutput, RunContext};
use crate::config::AccountConfig;
use crate::contract::Transport;
use crate::domain::library::{self, Loan, LibraryFragments, Reservation};
use crate::error::{AccountError, ScrapeError, ScrapeResult, Stage};
use crate::extract::markup::{amounts, date_in, optional_date_in, selector, strip_dates, text_within};
use crate::extract::text::integer_pair;
use crate::fetch::fetch;
use crate::session::establish;
use crate::sites::library::{arena, LibrarySite, LoanSelectors, ReservationSelectors};

pub struct LibraryAgent {
    site: LibrarySite,
}

impl LibraryAgent {
    pub fn new(site: LibrarySite) -> Self {
        Self { site }
    }
}

impl Default for LibraryAgent {
    fn default() -> Self {
        Self::new(arena())
    }
}

/// Every loan block in document order.
pub fn parse_loans(html: &str, selectors: &LoanSelectors) -> ScrapeResult<Vec<Loan>> {
    let doc = Html::parse_document(html);
    let block_sel = selector(selectors.block)?;
    let title_sel = selector(selectors.title)?;
    let location_sel = selector(selectors.location)?;
    let due_sel = selector(selectors.due)?;

    let mut loans = Vec::new();
    for block in doc.select(&block_sel) {
        let title = text_within(block, &title_sel).trim().to_string();
        let due_text = text_within(block, &due_sel);
        let due = date_in(&due_text)
            .map_err(|e| ScrapeError::Parse(format!("loan {title:?}: {e}")))?;
        let renewable = block
            .value()
            .classes()
            .any(|class| class == selectors.renewable_class);
        loans.push(Loan {
            location: strip_dates(&text_within(block, &location_sel)),
            title,
            due,
            renewable,
        });
    }
    debug!(count = loans.len(), "Parsed loans");
    Ok(loans)
}

/// Leading run of digits in `text`, 0 when there is none.
fn leading_number(text: &str) -> u32 {
    text.chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

pub fn parse_reservations(html: &str, selectors: &ReservationSelectors) -> ScrapeResult<Vec<Reservation>> {
    let doc = Html::parse_document(html);
    let block_sel = selector(selectors.block)?;
    let title_sel = selector(selectors.title)?;
    let queue_sel = selector(selectors.queue)?;
    let pickup_due_sel = selector(selectors.pickup_due)?;
    let pickup_slot_sel = selector(selectors.pickup_slot)?;

    let mut reservations = Vec::new();
    for block in doc.select(&block_sel) {
        let title = text_within(block, &title_sel).trim().to_string();
        let queue_text = text_within(block, &queue_sel);
        let (queue_position, copies_in_queue) =
            integer_pair(&queue_text, selectors.queue_pattern)?.unwrap_or((0, 0));
        reservations.push(Reservation {
            title,
            queue_position,
            copies_in_queue,
            pickup_due: optional_date_in(&text_within(block, &pickup_due_sel))?,
            pickup_slot: leading_number(&text_within(block, &pickup_slot_sel)),
        });
    }
    debug!(count = reservations.len(), "Parsed reservations");
    Ok(reservations)
}

/// Parses the three patron pages into fragments.
pub fn parse_fragments(
    site: &LibrarySite,
    loans_page: &str,
    reservations_page: &str,
    fees_page: &str,
) -> ScrapeResult<LibraryFragments> {
    Ok(LibraryFragments {
        loans: parse_loans(loans_page, &site.loans)?,
        reservations: parse_reservations(reservations_page, &site.reservations)?,
        fee_items: amounts(fees_page, site.fees.amount)?,
    })
}

#[async_trait]
impl Agent for LibraryAgent {
    fn domain(&self) -> &'static str {
        "library"
    }

    fn topic(&self, account: &AccountConfig) -> String {
        account.topic(self.site.topic_prefix)
    }

    async fn run(&self, transport: &dyn Transport, ctx: &RunContext<'_>) -> Result<AgentOutput, AccountError> {
        let credentials = ctx.account.credentials();
        let session = ctx.check(Stage::Login, establish(transport, &credentials, &self.site.auth).await)?;

        let loans_page = ctx.check(Stage::Fetch, fetch(&session, &self.site.loans_resource).await)?;
        let reservations_page = ctx.check(
            Stage::Fetch,
            fetch(&session, &self.site.reservations_resource).await,
        )?;
        let fees_page = ctx.check(Stage::Fetch, fetch(&session, &self.site.fees_resource).await)?;

        let fragments = ctx.check(
            Stage::Parse,
            parse_fragments(&self.site, &loans_page.body, &reservations_page.body, &fees_page.body),
        )?;
        let account = ctx.check(
            Stage::Assemble,
            library::assemble(&ctx.account.name, fragments, Local::now()),
        )?;

        let mut output = AgentOutput::default();
        ctx.check(Stage::Assemble, output.push_json(ctx.topic.clone(), &account))?;
        output.gauge("library_loans", account.loans.len() as f64);
        output.gauge("library_reservations", account.reservations.len() as f64);
        output.gauge("library_fee", account.fee);
        output.gauge("library_pickup", if account.reservation_pickup() { 1.0 } else { 0.0 });
        if let Some(loan) = account.first_due() {
            output.gauge("library_first_due", epoch_seconds(&loan.due));
        }

        info!(
            topic = %ctx.topic,
            loans = account.loans.len(),
            reservations = account.reservations.len(),
            fee = account.fee,
            "Library account assembled"
        );
        Ok(output)
    }
}
