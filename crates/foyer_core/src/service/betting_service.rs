//! Sports bets and their win/loss series per market.
//!
//! # Invariants
//! - Bets are walked by `placed_on` then insertion order.
//! - Void and pending bets never break or extend a streak.

use crate::error::{AppError, AppResult};
use crate::model::jeux::{Bet, BetId, BetOutcome};
use crate::repo::jeux_repo::BetRepository;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesStats {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub void: usize,
    pub pending: usize,
    /// `won / (won + lost)`, 0 when nothing is settled.
    pub win_rate: f64,
    /// Positive for a running win streak, negative for a loss streak.
    pub current_streak: i32,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub staked_cents: i64,
    pub profit_cents: i64,
    /// `profit / stake` over won and lost bets, 0 when nothing is settled.
    pub roi: f64,
}

impl SeriesStats {
    /// Folds `bets`, already in chronological order.
    pub fn compute<'a>(bets: impl IntoIterator<Item = &'a Bet>) -> Self {
        let mut stats = Self::default();
        let mut settled_stake = 0i64;
        for bet in bets {
            stats.total += 1;
            match bet.outcome {
                BetOutcome::Won => {
                    stats.won += 1;
                    stats.current_streak = stats.current_streak.max(0) + 1;
                    stats.longest_win_streak =
                        stats.longest_win_streak.max(stats.current_streak.unsigned_abs());
                }
                BetOutcome::Lost => {
                    stats.lost += 1;
                    stats.current_streak = stats.current_streak.min(0) - 1;
                    stats.longest_loss_streak =
                        stats.longest_loss_streak.max(stats.current_streak.unsigned_abs());
                }
                BetOutcome::Void => stats.void += 1,
                BetOutcome::Pending => stats.pending += 1,
            }
            if matches!(bet.outcome, BetOutcome::Won | BetOutcome::Lost) {
                settled_stake += bet.stake_cents;
            }
            if bet.outcome != BetOutcome::Void {
                stats.staked_cents += bet.stake_cents;
            }
            stats.profit_cents += bet.profit_cents();
        }
        let settled = stats.won + stats.lost;
        if settled > 0 {
            stats.win_rate = stats.won as f64 / settled as f64;
        }
        if settled_stake > 0 {
            stats.roi = stats.profit_cents as f64 / settled_stake as f64;
        }
        stats
    }
}

pub struct BettingService<B: BetRepository> {
    repo: B,
}

impl<B: BetRepository> BettingService<B> {
    pub fn new(repo: B) -> Self {
        Self { repo }
    }

    pub fn place_bet(&self, mut bet: Bet) -> AppResult<Bet> {
        bet.event = bet.event.trim().to_string();
        bet.market = bet.market.trim().to_lowercase();
        bet.selection = bet.selection.trim().to_string();
        bet.outcome = BetOutcome::Pending;
        self.repo.create_bet(&bet)?;
        info!("event=bet_place module=bets status=ok");
        Ok(bet)
    }

    pub fn get_bet(&self, id: BetId) -> AppResult<Bet> {
        self.repo
            .get_bet(id)?
            .ok_or_else(|| AppError::not_found("bet", id))
    }

    pub fn list_bets(&self, market: Option<&str>) -> AppResult<Vec<Bet>> {
        let market = market.map(|value| value.trim().to_lowercase());
        Ok(self.repo.list_bets(market.as_deref())?)
    }

    pub fn settle(&self, id: BetId, outcome: BetOutcome) -> AppResult<Bet> {
        let bet = self.repo.settle_bet(id, outcome)?;
        info!(
            "event=bet_settle module=bets status=ok outcome={}",
            outcome.as_str()
        );
        Ok(bet)
    }

    /// Series of every market plus the `"*"` aggregate over all bets.
    pub fn series_by_market(&self) -> AppResult<BTreeMap<String, SeriesStats>> {
        let bets = self.repo.list_bets(None)?;
        let mut by_market: BTreeMap<String, Vec<&Bet>> = BTreeMap::new();
        for bet in &bets {
            by_market.entry(bet.market.clone()).or_default().push(bet);
        }
        let mut series: BTreeMap<String, SeriesStats> = by_market
            .into_iter()
            .map(|(market, bets)| (market, SeriesStats::compute(bets)))
            .collect();
        series.insert(ALL_MARKETS.to_string(), SeriesStats::compute(&bets));
        Ok(series)
    }

    pub fn series_for_market(&self, market: &str) -> AppResult<SeriesStats> {
        Ok(SeriesStats::compute(&self.list_bets(Some(market))?))
    }
}

/// Key of the all-markets aggregate in [`BettingService::series_by_market`].
pub const ALL_MARKETS: &str = "*";
