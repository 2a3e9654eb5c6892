//! Lottery and sports-bet commands.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use foyer_core::model::jeux::BetOutcome;
use foyer_core::service::lottery_service::SuggestStrategy;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
pub struct LotteryCommand {
    #[command(subcommand)]
    pub action: LotteryAction,
}

#[derive(Debug, Subcommand)]
pub enum LotteryAction {
    /// Record a draw.
    AddDraw {
        date: NaiveDate,
        /// Five numbers, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        numbers: Vec<u8>,
        /// Two stars, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        stars: Vec<u8>,
        #[arg(long, value_parser = super::parse_euros)]
        jackpot: Option<i64>,
    },
    /// Import draws from a `date,n1..n5,s1,s2` CSV file.
    Import { file: PathBuf },
    /// Latest draws, most recent first.
    Draws {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Frequency and streak statistics.
    Stats {
        /// Balls listed per ranking.
        #[arg(long, default_value = "5")]
        top: usize,
    },
    /// Compare balls with a recorded draw.
    Check {
        date: NaiveDate,
        #[arg(long, value_delimiter = ',', required = true)]
        numbers: Vec<u8>,
        #[arg(long, value_delimiter = ',', required = true)]
        stars: Vec<u8>,
    },
    /// Suggest a grid from the statistics.
    Suggest {
        #[arg(long, value_enum, default_value = "balanced")]
        strategy: Strategy,
    },
    /// Track a virtual grid for a draw date.
    Play {
        date: NaiveDate,
        #[arg(long, value_delimiter = ',', required = true)]
        numbers: Vec<u8>,
        #[arg(long, value_delimiter = ',', required = true)]
        stars: Vec<u8>,
        #[arg(long, value_parser = super::parse_euros, default_value = "2.5")]
        stake: i64,
    },
    /// Results of the tracked grids.
    Performance,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Strategy {
    Hot,
    Overdue,
    Balanced,
}

impl From<Strategy> for SuggestStrategy {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::Hot => SuggestStrategy::Hot,
            Strategy::Overdue => SuggestStrategy::Overdue,
            Strategy::Balanced => SuggestStrategy::Balanced,
        }
    }
}

#[derive(Debug, Parser)]
pub struct BetsCommand {
    #[command(subcommand)]
    pub action: BetsAction,
}

#[derive(Debug, Subcommand)]
pub enum BetsAction {
    /// Record a pending bet.
    Add {
        #[arg(long)]
        event: String,
        /// Grouping key for series (league, team, bet type).
        #[arg(long)]
        market: String,
        #[arg(long, default_value = "")]
        selection: String,
        #[arg(long)]
        odds: f64,
        #[arg(long, value_parser = super::parse_euros)]
        stake: i64,
        /// Defaults to the reference day.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    List {
        #[arg(long)]
        market: Option<String>,
    },
    /// Settle a pending bet.
    Settle {
        id: Uuid,
        #[arg(value_enum)]
        outcome: Outcome,
    },
    /// Win/loss series per market.
    Stats {
        #[arg(long)]
        market: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Outcome {
    Won,
    Lost,
    Void,
}

impl From<Outcome> for BetOutcome {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Won => BetOutcome::Won,
            Outcome::Lost => BetOutcome::Lost,
            Outcome::Void => BetOutcome::Void,
        }
    }
}
