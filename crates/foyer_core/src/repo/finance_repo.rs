//! Budget repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Category names are unique case-insensitively; `upsert_category`
//!   updates the limit of an existing name instead of duplicating it.
//! - Month queries cover `[first day, first day of next month)`.

use crate::model::finance::{BudgetCategory, CategoryId, Expense, ExpenseId};
use crate::repo::{ensure_tables, parse_uuid, RepoError, RepoResult};
use crate::validation::{require_int_range, ValidationError};
use chrono::{Months, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait FinanceRepository {
    /// Inserts the category, or updates the limit of the one with the same
    /// name. Returns the stored row.
    fn upsert_category(&self, category: &BudgetCategory) -> RepoResult<BudgetCategory>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<BudgetCategory>>;
    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<BudgetCategory>>;
    fn list_categories(&self) -> RepoResult<Vec<BudgetCategory>>;
    fn add_expense(&self, expense: &Expense) -> RepoResult<ExpenseId>;
    fn list_expenses_for_month(&self, year: i32, month: u32) -> RepoResult<Vec<Expense>>;
    fn delete_expense(&self, id: ExpenseId) -> RepoResult<()>;
}

pub struct SqliteFinanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFinanceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["budget_categories", "expenses"])?;
        Ok(Self { conn })
    }
}

impl FinanceRepository for SqliteFinanceRepository<'_> {
    fn upsert_category(&self, category: &BudgetCategory) -> RepoResult<BudgetCategory> {
        category.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        let stored = match self.find_category_by_name(&category.name)? {
            Some(mut existing) => {
                existing.monthly_limit_cents = category.monthly_limit_cents;
                self.conn.execute(
                    "UPDATE budget_categories SET monthly_limit_cents = ?1 WHERE uuid = ?2;",
                    params![existing.monthly_limit_cents, existing.id.to_string()],
                )?;
                existing
            }
            None => {
                self.conn.execute(
                    "INSERT INTO budget_categories (uuid, name, monthly_limit_cents)
                     VALUES (?1, ?2, ?3);",
                    params![
                        category.id.to_string(),
                        category.name.trim(),
                        category.monthly_limit_cents,
                    ],
                )?;
                BudgetCategory {
                    name: category.name.trim().to_string(),
                    ..category.clone()
                }
            }
        };
        tx.commit()?;
        Ok(stored)
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<BudgetCategory>> {
        self.conn
            .query_row(
                "SELECT uuid, name, monthly_limit_cents FROM budget_categories WHERE uuid = ?1;",
                [id.to_string()],
                |row| Ok(parse_category_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<BudgetCategory>> {
        self.conn
            .query_row(
                "SELECT uuid, name, monthly_limit_cents
                 FROM budget_categories
                 WHERE name = ?1 COLLATE NOCASE;",
                [name.trim()],
                |row| Ok(parse_category_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_categories(&self) -> RepoResult<Vec<BudgetCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, monthly_limit_cents
             FROM budget_categories
             ORDER BY name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn add_expense(&self, expense: &Expense) -> RepoResult<ExpenseId> {
        expense.validate()?;
        if self.get_category(expense.category_id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "budget_category",
                id: expense.category_id,
            });
        }
        self.conn.execute(
            "INSERT INTO expenses (uuid, category_uuid, amount_cents, spent_on, label)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                expense.id.to_string(),
                expense.category_id.to_string(),
                expense.amount_cents,
                expense.spent_on,
                expense.label.trim(),
            ],
        )?;
        Ok(expense.id)
    }

    fn list_expenses_for_month(&self, year: i32, month: u32) -> RepoResult<Vec<Expense>> {
        let (first, next) = month_bounds(year, month)?;
        let mut stmt = self.conn.prepare(
            "SELECT uuid, category_uuid, amount_cents, spent_on, label
             FROM expenses
             WHERE spent_on >= ?1 AND spent_on < ?2
             ORDER BY spent_on ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query(params![first, next])?;
        let mut expenses = Vec::new();
        while let Some(row) = rows.next()? {
            expenses.push(parse_expense_row(row)?);
        }
        Ok(expenses)
    }

    fn delete_expense(&self, id: ExpenseId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM expenses WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "expense",
                id,
            });
        }
        Ok(())
    }
}

/// First day of the month and first day of the following month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), ValidationError> {
    require_int_range("budget.month", i64::from(month), 1, 12)?;
    let unsupported =
        || ValidationError::invalid("budget.year", format!("unsupported year {year}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(unsupported)?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(unsupported)?;
    Ok((first, next))
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<BudgetCategory> {
    let uuid_text: String = row.get("uuid")?;
    let category = BudgetCategory {
        id: parse_uuid("budget_categories.uuid", &uuid_text)?,
        name: row.get("name")?,
        monthly_limit_cents: row.get("monthly_limit_cents")?,
    };
    category.validate()?;
    Ok(category)
}

fn parse_expense_row(row: &Row<'_>) -> RepoResult<Expense> {
    let uuid_text: String = row.get("uuid")?;
    let category_text: String = row.get("category_uuid")?;
    let expense = Expense {
        id: parse_uuid("expenses.uuid", &uuid_text)?,
        category_id: parse_uuid("expenses.category_uuid", &category_text)?,
        amount_cents: row.get("amount_cents")?,
        spent_on: row.get("spent_on")?,
        label: row.get("label")?,
    };
    expense.validate()?;
    Ok(expense)
}

#[cfg(test)]
mod tests {
    use super::month_bounds;
    use chrono::NaiveDate;

    #[test]
    fn month_bounds_roll_over_december() {
        let (first, next) = month_bounds(2026, 12).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert_eq!(next, NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }

    #[test]
    fn month_outside_calendar_is_rejected() {
        assert!(month_bounds(2026, 0).is_err());
        assert!(month_bounds(2026, 13).is_err());
    }
}
