//! Budget categories and expenses.
//!
//! Amounts are integer cents to keep sums exact.

use crate::validation::{require_non_blank, ValidationError, ValidationErrorKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CategoryId = Uuid;
pub type ExpenseId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub id: CategoryId,
    pub name: String,
    pub monthly_limit_cents: i64,
}

impl BudgetCategory {
    pub fn new(name: impl Into<String>, monthly_limit_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            monthly_limit_cents,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("budget_category.name", &self.name)?;
        require_positive_cents("budget_category.monthly_limit_cents", self.monthly_limit_cents)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub category_id: CategoryId,
    pub amount_cents: i64,
    pub spent_on: NaiveDate,
    pub label: String,
}

impl Expense {
    pub fn new(
        category_id: CategoryId,
        amount_cents: i64,
        spent_on: NaiveDate,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            amount_cents,
            spent_on,
            label: label.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive_cents("expense.amount_cents", self.amount_cents)
    }
}

fn require_positive_cents(field: &'static str, cents: i64) -> Result<(), ValidationError> {
    if cents <= 0 {
        return Err(ValidationError::new(field, ValidationErrorKind::NotPositive));
    }
    Ok(())
}
