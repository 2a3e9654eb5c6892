//! Household domain model.
//!
//! # Responsibility
//! - Define canonical records for every vertical (cuisine, jeux, finances,
//!   famille, maison).
//! - Own per-record invariants through `validate()` and lifecycle helpers.
//!
//! # Invariants
//! - Every record is identified by a stable UUID v4.
//! - Calendar days are `NaiveDate`; instants are epoch milliseconds.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod batch;
pub mod famille;
pub mod finance;
pub mod garden;
pub mod inventory;
pub mod jeux;
pub mod recipe;
pub mod shopping;

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Lowercases, trims and deduplicates free-form labels. Blank values are
/// dropped; output is sorted.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Key used to match the same product across inventory, recipes and the
/// shopping list.
pub fn product_key(name: &str, unit: &str) -> (String, String) {
    (name.trim().to_lowercase(), unit.trim().to_lowercase())
}

/// Rounds a quantity to two decimals.
pub fn round_quantity(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, product_key, round_quantity};

    #[test]
    fn tags_are_trimmed_lowercased_and_deduplicated() {
        let tags = vec![
            " Végé ".to_string(),
            "rapide".to_string(),
            "végé".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["rapide", "végé"]);
    }

    #[test]
    fn product_key_ignores_case_and_padding() {
        assert_eq!(product_key(" Farine ", "G"), product_key("farine", "g"));
    }

    #[test]
    fn quantities_round_to_cents() {
        assert_eq!(round_quantity(1.0 / 3.0), 0.33);
        assert_eq!(round_quantity(2.005_1), 2.01);
    }
}
