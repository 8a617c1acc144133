//! Domain entities and their assemblers.
//!
//! Entities are value objects, rebuilt from fragments on every poll. Their JSON shape
//! is what downstream consumers read from the bus, so field names are pinned with
//! `serde` attributes and must not change.

pub mod grocery;
pub mod library;
pub mod transit;

/// Rounds a currency amount to whole öre.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
