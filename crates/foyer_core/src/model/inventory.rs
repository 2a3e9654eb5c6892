//! Pantry inventory model.
//!
//! # Invariants
//! - `quantity >= 0` and `min_quantity >= 0`.
//! - `barcode`, when set, is a checksum-valid EAN-8, UPC-A or EAN-13.

use crate::validation::{
    require_max_len, require_non_blank, require_non_negative, ValidationError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ArticleId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    /// Low-stock threshold; `0` disables the alert.
    pub min_quantity: f64,
    pub location: String,
    pub expiry_date: Option<NaiveDate>,
    pub barcode: Option<String>,
}

impl Article {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: String::new(),
            quantity,
            unit: unit.into(),
            min_quantity: 0.0,
            location: String::new(),
            expiry_date: None,
            barcode: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("article.name", &self.name)?;
        require_max_len("article.name", &self.name, 200)?;
        require_non_negative("article.quantity", self.quantity)?;
        require_non_negative("article.min_quantity", self.min_quantity)?;
        if let Some(code) = self.barcode.as_deref() {
            if !is_valid_barcode(code) {
                return Err(ValidationError::invalid(
                    "article.barcode",
                    "expected an EAN-8, UPC-A or EAN-13 code with a valid check digit",
                ));
            }
        }
        Ok(())
    }

    /// `true` when a threshold is set and the stock is at or below it.
    pub fn is_low_stock(&self) -> bool {
        self.min_quantity > 0.0 && self.quantity <= self.min_quantity
    }

    /// Signed day count until expiry; negative once expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date
            .map(|expiry| expiry.signed_duration_since(today).num_days())
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.days_until_expiry(today).is_some_and(|days| days < 0)
    }

    /// Folds a new arrival of the same product into this article.
    ///
    /// Quantities add up, the earliest known expiry wins and descriptive
    /// fields are only filled when still empty.
    pub fn merge_stock(&mut self, incoming: &Article) {
        self.quantity += incoming.quantity;
        self.expiry_date = match (self.expiry_date, incoming.expiry_date) {
            (Some(current), Some(new)) => Some(current.min(new)),
            (current, new) => current.or(new),
        };
        if incoming.min_quantity > 0.0 {
            self.min_quantity = incoming.min_quantity;
        }
        if self.category.trim().is_empty() {
            self.category = incoming.category.clone();
        }
        if self.location.trim().is_empty() {
            self.location = incoming.location.clone();
        }
        if self.barcode.is_none() {
            self.barcode = incoming.barcode.clone();
        }
    }
}

/// Validates a GTIN barcode (EAN-8, UPC-A/GTIN-12, EAN-13) check digit.
pub fn is_valid_barcode(code: &str) -> bool {
    let code = code.trim();
    if !matches!(code.len(), 8 | 12 | 13) || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = code.bytes().map(|b| u32::from(b - b'0')).collect();
    let (payload, check) = digits.split_at(digits.len() - 1);
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(index, digit)| if index % 2 == 0 { digit * 3 } else { *digit })
        .sum();
    (10 - sum % 10) % 10 == check[0]
}
