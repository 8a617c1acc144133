use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::round_cents;
use crate::error::ScrapeResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub title: String,
    /// Local midnight of the due day.
    #[serde(rename = "date_due")]
    pub due: DateTime<Local>,
    #[serde(rename = "library_name")]
    pub location: String,
    pub renewable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub title: String,
    #[serde(rename = "que_position")]
    pub queue_position: u32,
    #[serde(rename = "books_total")]
    pub copies_in_queue: u32,
    /// Last day to pick the item up; `None` until the item is waiting.
    pub pickup_due: Option<DateTime<Local>>,
    /// Shelf slot at the pickup desk, 0 when not ready.
    #[serde(rename = "pickup_number")]
    pub pickup_slot: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryAccount {
    pub name: String,
    pub fee: f64,
    pub updated: DateTime<Local>,
    #[serde(rename = "books")]
    pub loans: Vec<Loan>,
    pub reservations: Vec<Reservation>,
}

impl LibraryAccount {
    pub fn first_due(&self) -> Option<&Loan> {
        first_due(&self.loans)
    }

    pub fn reservation_pickup(&self) -> bool {
        reservation_pickup(&self.reservations)
    }
}

/// The loan due first. Ties go to the loan listed first.
pub fn first_due(loans: &[Loan]) -> Option<&Loan> {
    loans.iter().fold(None, |best: Option<&Loan>, loan| match best {
        Some(b) if b.due <= loan.due => Some(b),
        _ => Some(loan),
    })
}

/// True when any reservation is waiting at the pickup desk.
pub fn reservation_pickup(reservations: &[Reservation]) -> bool {
    reservations.iter().any(|r| r.pickup_slot > 0)
}

/// Everything scraped for one patron before assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryFragments {
    pub loans: Vec<Loan>,
    pub reservations: Vec<Reservation>,
    /// One entry per fee line item.
    pub fee_items: Vec<f64>,
}

pub fn assemble(
    name: &str,
    fragments: LibraryFragments,
    now: DateTime<Local>,
) -> ScrapeResult<LibraryAccount> {
    let fee = round_cents(fragments.fee_items.iter().sum());
    Ok(LibraryAccount {
        name: name.to_string(),
        fee,
        updated: now,
        loans: fragments.loans,
        reservations: fragments.reservations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parse_ymd;

    fn loan(title: &str, due: &str) -> Loan {
        Loan {
            title: title.into(),
            due: parse_ymd(due).unwrap(),
            location: "Centralbiblioteket".into(),
            renewable: true,
        }
    }

    fn reservation(slot: u32) -> Reservation {
        Reservation {
            title: format!("Bok {slot}"),
            queue_position: 1,
            copies_in_queue: 3,
            pickup_due: None,
            pickup_slot: slot,
        }
    }

    #[test]
    fn first_due_of_nothing_is_none() {
        assert_eq!(first_due(&[]), None);
    }

    #[test]
    fn first_due_picks_earliest() {
        let loans = vec![loan("Sen", "2023-05-20"), loan("Tidig", "2023-05-02")];
        assert_eq!(first_due(&loans).unwrap().title, "Tidig");
    }

    #[test]
    fn first_due_tie_keeps_first_encountered() {
        let loans = vec![
            loan("Senare", "2023-06-01"),
            loan("Först", "2023-05-02"),
            loan("Också", "2023-05-02"),
        ];
        assert_eq!(first_due(&loans).unwrap().title, "Först");
    }

    #[test]
    fn reservation_pickup_needs_a_slot() {
        assert!(!reservation_pickup(&[]));
        assert!(!reservation_pickup(&[reservation(0), reservation(0)]));
        assert!(reservation_pickup(&[reservation(0), reservation(12)]));
    }

    #[test]
    fn assemble_sums_fee_items_and_stamps_now() {
        let now = Local::now();
        let account = assemble(
            "Anna",
            LibraryFragments {
                loans: vec![loan("A", "2023-05-02")],
                reservations: vec![],
                fee_items: vec![12.5, 0.0, 10.0],
            },
            now,
        )
        .unwrap();
        assert_eq!(account.fee, 22.5);
        assert_eq!(account.updated, now);
        assert!(account.reservations.is_empty());
        assert!(!account.reservation_pickup());
    }

    #[test]
    fn fee_sum_is_whole_ore() {
        let account = assemble(
            "Anna",
            LibraryFragments {
                fee_items: vec![12.5, 0.1, 0.2],
                ..LibraryFragments::default()
            },
            Local::now(),
        )
        .unwrap();
        assert_eq!(account.fee, 12.8);
        assert!(serde_json::to_string(&account).unwrap().contains("\"fee\":12.8,"));
    }

    #[test]
    fn published_json_parses_back_to_the_same_account() {
        let mut waiting = reservation(7);
        waiting.pickup_due = Some(parse_ymd("2023-05-10").unwrap());
        let account = assemble(
            "Anna",
            LibraryFragments {
                loans: vec![loan("Kallocain", "2023-05-02"), loan("Röda rummet", "2023-06-01")],
                reservations: vec![reservation(0), waiting],
                fee_items: vec![12.5, 0.1, 0.2],
            },
            Local::now(),
        )
        .unwrap();

        let json = serde_json::to_string(&account).unwrap();
        let reparsed: LibraryAccount = serde_json::from_str(&json).unwrap();
        assert_eq!(account, reparsed);
    }
}
