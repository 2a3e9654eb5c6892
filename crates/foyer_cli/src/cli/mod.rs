//! Command-line definitions.

pub mod cuisine;
pub mod famille;
pub mod finances;
pub mod jeux;
pub mod maison;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Household manager: recipes, stock, batch cooking, games, budget, family.
#[derive(Debug, Parser)]
#[command(name = "foyer", version)]
#[command(about = "Household manager", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "FOYER_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path, overrides the configuration.
    #[arg(long, global = true, env = "FOYER_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Reference day for date-based commands (YYYY-MM-DD), defaults to today.
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON, one document per command.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database and apply migrations.
    Init,
    /// Recipe book.
    Recipe(cuisine::RecipeCommand),
    /// Pantry, fridge and freezer stock.
    Inventory(cuisine::InventoryCommand),
    /// Shopping list.
    Shopping(cuisine::ShoppingCommand),
    /// Batch cooking sessions.
    Batch(cuisine::BatchCommand),
    /// Lottery draws, statistics and grids.
    Lottery(jeux::LotteryCommand),
    /// Sports bets and series.
    Bets(jeux::BetsCommand),
    /// Monthly budget.
    Budget(finances::BudgetCommand),
    /// Family members, health record and agenda.
    Family(famille::FamilyCommand),
    /// Garden zones and watering.
    Garden(maison::GardenCommand),
}

/// Parses an amount in euros (`12.5`, `12,50`) into cents.
pub fn parse_euros(value: &str) -> Result<i64, String> {
    let euros: f64 = value
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("invalid amount `{value}`"))?;
    if !euros.is_finite() {
        return Err(format!("invalid amount `{value}`"));
    }
    Ok((euros * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::{parse_euros, Cli};
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn euros_accept_decimal_comma() {
        assert_eq!(parse_euros("12,50"), Ok(1_250));
        assert_eq!(parse_euros("3"), Ok(300));
        assert!(parse_euros("abc").is_err());
    }
}
