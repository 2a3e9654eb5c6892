//! Lottery (Euromillions-shaped) and sports-bet records.
//!
//! # Invariants
//! - A draw or grid has 5 distinct numbers in `1..=50` and 2 distinct stars
//!   in `1..=12`, both stored sorted ascending.
//! - Bets have `odds > 1.0` and a positive stake; only pending bets settle.

use crate::validation::{
    require_distinct, require_int_range, require_non_blank, ValidationError, ValidationErrorKind,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DrawId = Uuid;
pub type GridId = Uuid;
pub type BetId = Uuid;

pub const NUMBER_COUNT: usize = 5;
pub const NUMBER_MAX: u8 = 50;
pub const STAR_COUNT: usize = 2;
pub const STAR_MAX: u8 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryDraw {
    pub id: DrawId,
    pub draw_date: NaiveDate,
    pub numbers: Vec<u8>,
    pub stars: Vec<u8>,
    pub jackpot_cents: Option<i64>,
}

impl LotteryDraw {
    /// Builds a draw; balls are sorted, not validated.
    pub fn new(draw_date: NaiveDate, mut numbers: Vec<u8>, mut stars: Vec<u8>) -> Self {
        numbers.sort_unstable();
        stars.sort_unstable();
        Self {
            id: Uuid::new_v4(),
            draw_date,
            numbers,
            stars,
            jackpot_cents: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_balls("lottery_draw.numbers", &self.numbers, NUMBER_COUNT, NUMBER_MAX)?;
        validate_balls("lottery_draw.stars", &self.stars, STAR_COUNT, STAR_MAX)?;
        if let Some(jackpot) = self.jackpot_cents {
            if jackpot < 0 {
                return Err(ValidationError::new(
                    "lottery_draw.jackpot_cents",
                    ValidationErrorKind::Negative,
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryGrid {
    pub id: GridId,
    pub draw_date: NaiveDate,
    pub numbers: Vec<u8>,
    pub stars: Vec<u8>,
    pub stake_cents: i64,
    /// Virtual grids are tracked for statistics only, no money involved.
    pub is_virtual: bool,
    pub created_at: i64,
}

impl LotteryGrid {
    pub fn new(
        draw_date: NaiveDate,
        mut numbers: Vec<u8>,
        mut stars: Vec<u8>,
        stake_cents: i64,
        created_at: i64,
    ) -> Self {
        numbers.sort_unstable();
        stars.sort_unstable();
        Self {
            id: Uuid::new_v4(),
            draw_date,
            numbers,
            stars,
            stake_cents,
            is_virtual: true,
            created_at,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_grid_balls(&self.numbers, &self.stars)?;
        if self.stake_cents <= 0 {
            return Err(ValidationError::new(
                "lottery_grid.stake_cents",
                ValidationErrorKind::NotPositive,
            ));
        }
        Ok(())
    }
}

/// Checks a played combination: 5 distinct numbers in 1..=50 and 2 distinct
/// stars in 1..=12.
pub fn validate_grid_balls(numbers: &[u8], stars: &[u8]) -> Result<(), ValidationError> {
    validate_balls("lottery_grid.numbers", numbers, NUMBER_COUNT, NUMBER_MAX)?;
    validate_balls("lottery_grid.stars", stars, STAR_COUNT, STAR_MAX)
}

fn validate_balls(
    field: &'static str,
    balls: &[u8],
    expected: usize,
    max: u8,
) -> Result<(), ValidationError> {
    if balls.len() != expected {
        return Err(ValidationError::invalid(
            field,
            format!("expected {expected} values, got {}", balls.len()),
        ));
    }
    for ball in balls {
        require_int_range(field, i64::from(*ball), 1, i64::from(max))?;
    }
    require_distinct(field, balls)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetOutcome {
    Pending,
    Won,
    Lost,
    /// Cancelled event; stake refunded.
    Void,
}

impl BetOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Won => "won",
            Self::Lost => "lost",
            Self::Void => "void",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "won" => Some(Self::Won),
            "lost" => Some(Self::Lost),
            "void" => Some(Self::Void),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub placed_on: NaiveDate,
    pub event: String,
    /// Grouping key for streak statistics (team, league, bet type).
    pub market: String,
    pub selection: String,
    pub odds: f64,
    pub stake_cents: i64,
    pub outcome: BetOutcome,
}

impl Bet {
    pub fn new(
        placed_on: NaiveDate,
        event: impl Into<String>,
        market: impl Into<String>,
        odds: f64,
        stake_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            placed_on,
            event: event.into(),
            market: market.into(),
            selection: String::new(),
            odds,
            stake_cents,
            outcome: BetOutcome::Pending,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("bet.event", &self.event)?;
        require_non_blank("bet.market", &self.market)?;
        if !self.odds.is_finite() || self.odds <= 1.0 {
            return Err(ValidationError::invalid("bet.odds", "must be greater than 1.0"));
        }
        if self.stake_cents <= 0 {
            return Err(ValidationError::new(
                "bet.stake_cents",
                ValidationErrorKind::NotPositive,
            ));
        }
        Ok(())
    }

    /// Net result in cents: `stake * (odds - 1)` when won, `-stake` when
    /// lost, `0` otherwise.
    pub fn profit_cents(&self) -> i64 {
        match self.outcome {
            BetOutcome::Won => ((self.stake_cents as f64) * (self.odds - 1.0)).round() as i64,
            BetOutcome::Lost => -self.stake_cents,
            BetOutcome::Pending | BetOutcome::Void => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
    }

    #[test]
    fn draw_sorts_balls_and_validates_ranges() {
        let draw = LotteryDraw::new(date(), vec![44, 3, 17, 28, 9], vec![11, 2]);
        assert_eq!(draw.numbers, vec![3, 9, 17, 28, 44]);
        assert_eq!(draw.stars, vec![2, 11]);
        assert!(draw.validate().is_ok());

        assert!(LotteryDraw::new(date(), vec![1, 2, 3, 4, 51], vec![1, 2]).validate().is_err());
        assert!(LotteryDraw::new(date(), vec![1, 2, 3, 4, 4], vec![1, 2]).validate().is_err());
        assert!(LotteryDraw::new(date(), vec![1, 2, 3, 4, 5], vec![13, 2]).validate().is_err());
        assert!(LotteryDraw::new(date(), vec![1, 2, 3, 4], vec![1, 2]).validate().is_err());
    }

    #[test]
    fn bet_profit_depends_on_outcome() {
        let mut bet = Bet::new(date(), "PSG - OM", "ligue1", 2.5, 1_000);
        assert_eq!(bet.profit_cents(), 0);
        bet.outcome = BetOutcome::Won;
        assert_eq!(bet.profit_cents(), 1_500);
        bet.outcome = BetOutcome::Lost;
        assert_eq!(bet.profit_cents(), -1_000);
        bet.outcome = BetOutcome::Void;
        assert_eq!(bet.profit_cents(), 0);
    }

    #[test]
    fn bet_odds_must_exceed_one() {
        assert!(Bet::new(date(), "a", "m", 1.0, 100).validate().is_err());
        assert!(Bet::new(date(), "a", "m", 1.01, 100).validate().is_ok());
        assert!(Bet::new(date(), "a", "m", 2.0, 0).validate().is_err());
    }
}
