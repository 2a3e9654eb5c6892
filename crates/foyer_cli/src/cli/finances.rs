//! Budget commands.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
pub struct BudgetCommand {
    #[command(subcommand)]
    pub action: BudgetAction,
}

#[derive(Debug, Subcommand)]
pub enum BudgetAction {
    /// Create a category or change its monthly limit.
    Category {
        name: String,
        #[arg(long, value_parser = super::parse_euros)]
        limit: i64,
    },
    Categories,
    /// Record an expense.
    Expense {
        category: String,
        #[arg(value_parser = super::parse_euros)]
        amount: i64,
        #[arg(long, default_value = "")]
        label: String,
        /// Defaults to the reference day.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Expenses of a month.
    Expenses {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    DeleteExpense { id: Uuid },
    /// Spending against limits for a month, defaults to the current one.
    Summary {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
}
