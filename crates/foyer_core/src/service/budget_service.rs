//! Monthly budget tracking.
//!
//! # Invariants
//! - A category is `Over` once spending exceeds its limit, `Warning` from
//!   `warning_ratio × limit`, `Ok` below.

use crate::error::{AppError, AppResult};
use crate::model::finance::{BudgetCategory, Expense, ExpenseId};
use crate::repo::finance_repo::{month_bounds, FinanceRepository};
use crate::validation::require_range;
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Ok,
    Warning,
    Over,
}

impl BudgetStatus {
    pub fn classify(spent_cents: i64, limit_cents: i64, warning_ratio: f64) -> Self {
        if spent_cents > limit_cents {
            Self::Over
        } else if spent_cents as f64 >= limit_cents as f64 * warning_ratio {
            Self::Warning
        } else {
            Self::Ok
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Over => "over",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: BudgetCategory,
    pub spent_cents: i64,
    pub remaining_cents: i64,
    pub ratio: f64,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub categories: Vec<CategorySummary>,
    pub total_limit_cents: i64,
    pub total_spent_cents: i64,
    pub status: BudgetStatus,
}

pub struct BudgetService<F: FinanceRepository> {
    repo: F,
    warning_ratio: f64,
}

impl<F: FinanceRepository> BudgetService<F> {
    pub fn new(repo: F, warning_ratio: f64) -> AppResult<Self> {
        require_range("budget.warning_ratio", warning_ratio, f64::MIN_POSITIVE, 1.0)?;
        Ok(Self { repo, warning_ratio })
    }

    /// Creates the category or updates the limit of the one with the same
    /// name.
    pub fn set_category(&self, name: &str, monthly_limit_cents: i64) -> AppResult<BudgetCategory> {
        let category = self
            .repo
            .upsert_category(&BudgetCategory::new(name.trim(), monthly_limit_cents))?;
        info!("event=budget_category_set module=budget status=ok");
        Ok(category)
    }

    pub fn list_categories(&self) -> AppResult<Vec<BudgetCategory>> {
        Ok(self.repo.list_categories()?)
    }

    /// Records an expense against the category named `category`.
    pub fn add_expense(
        &self,
        category: &str,
        amount_cents: i64,
        spent_on: NaiveDate,
        label: &str,
    ) -> AppResult<Expense> {
        let category = self
            .repo
            .find_category_by_name(category.trim())?
            .ok_or_else(|| AppError::not_found("budget_category", category.trim()))?;
        let expense = Expense::new(category.id, amount_cents, spent_on, label.trim());
        self.repo.add_expense(&expense)?;
        info!("event=budget_expense_add module=budget status=ok");
        Ok(expense)
    }

    pub fn list_expenses(&self, year: i32, month: u32) -> AppResult<Vec<Expense>> {
        month_bounds(year, month)?;
        Ok(self.repo.list_expenses_for_month(year, month)?)
    }

    pub fn delete_expense(&self, id: ExpenseId) -> AppResult<()> {
        self.repo.delete_expense(id)?;
        Ok(())
    }

    pub fn monthly_summary(&self, year: i32, month: u32) -> AppResult<MonthlySummary> {
        month_bounds(year, month)?;
        let mut spent: HashMap<_, i64> = HashMap::new();
        for expense in self.repo.list_expenses_for_month(year, month)? {
            *spent.entry(expense.category_id).or_insert(0) += expense.amount_cents;
        }
        let categories: Vec<CategorySummary> = self
            .repo
            .list_categories()?
            .into_iter()
            .map(|category| {
                let spent_cents = spent.get(&category.id).copied().unwrap_or(0);
                let limit = category.monthly_limit_cents;
                CategorySummary {
                    spent_cents,
                    remaining_cents: limit - spent_cents,
                    ratio: ratio(spent_cents, limit),
                    status: BudgetStatus::classify(spent_cents, limit, self.warning_ratio),
                    category,
                }
            })
            .collect();
        let total_limit_cents = categories
            .iter()
            .map(|summary| summary.category.monthly_limit_cents)
            .sum();
        let total_spent_cents = categories.iter().map(|summary| summary.spent_cents).sum();
        let over = categories
            .iter()
            .filter(|summary| summary.status == BudgetStatus::Over)
            .count();
        info!(
            "event=budget_summary module=budget status=ok categories={} over={over}",
            categories.len()
        );
        Ok(MonthlySummary {
            year,
            month,
            status: BudgetStatus::classify(
                total_spent_cents,
                total_limit_cents,
                self.warning_ratio,
            ),
            categories,
            total_limit_cents,
            total_spent_cents,
        })
    }
}

fn ratio(spent_cents: i64, limit_cents: i64) -> f64 {
    if limit_cents <= 0 {
        return 0.0;
    }
    ((spent_cents as f64 / limit_cents as f64) * 1000.0).round() / 1000.0
}
