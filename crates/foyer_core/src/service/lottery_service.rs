//! Lottery history, "loi des séries" statistics and grid checking.
//!
//! # Responsibility
//! - Record draws (manually or from CSV) and virtual grids.
//! - Compute per-ball frequency and gap statistics, cached with a TTL.
//! - Rank grids against a draw and suggest deterministic grids.
//!
//! # Invariants
//! - Statistics walk draws in chronological order; gaps count draws.
//! - The statistics cache is invalidated whenever the history changes.
//! - With an empty history, statistics run on [`fallback_draws`].

use crate::cache::TtlCache;
use crate::error::{AppError, AppResult};
use crate::model::jeux::{
    validate_grid_balls, LotteryDraw, LotteryGrid, NUMBER_COUNT, NUMBER_MAX, STAR_COUNT,
    STAR_MAX,
};
use crate::repo::jeux_repo::LotteryRepository;
use crate::service::csv_io::read_rows;
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

const STATS_KEY: &str = "lottery:stats";

pub const DRAW_CSV_HEADER: [&str; 8] = ["date", "n1", "n2", "n3", "n4", "n5", "s1", "s2"];

/// Euromillions prize ranks as `(numbers, stars)`, best first.
const PRIZE_TABLE: [(usize, usize); 13] = [
    (5, 2),
    (5, 1),
    (5, 0),
    (4, 2),
    (4, 1),
    (3, 2),
    (4, 0),
    (2, 2),
    (3, 1),
    (3, 0),
    (1, 2),
    (2, 1),
    (2, 0),
];

/// Statistics of one ball over the analyzed history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BallStats {
    pub ball: u8,
    pub frequency: u32,
    /// Draws since the ball last came out; `Some(0)` when it is in the
    /// latest draw, `None` when never seen.
    pub last_seen_draws_ago: Option<u32>,
    /// Longest run of consecutive draws without the ball.
    pub max_gap: u32,
    /// Expected draws between two appearances (`draws / frequency`).
    pub average_gap: f64,
    /// `current gap / average gap`; above 1 the ball is "late".
    pub streak_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotteryStats {
    pub draws_analyzed: usize,
    /// `true` when computed on the built-in dataset.
    pub from_fallback: bool,
    pub numbers: Vec<BallStats>,
    pub stars: Vec<BallStats>,
}

impl LotteryStats {
    /// Computes statistics over `draws`, in any order.
    pub fn compute(draws: &[LotteryDraw], from_fallback: bool) -> Self {
        let mut chronological: Vec<&LotteryDraw> = draws.iter().collect();
        chronological.sort_by_key(|draw| draw.draw_date);
        let numbers: Vec<&[u8]> = chronological
            .iter()
            .map(|draw| draw.numbers.as_slice())
            .collect();
        let stars: Vec<&[u8]> = chronological.iter().map(|draw| draw.stars.as_slice()).collect();
        Self {
            draws_analyzed: chronological.len(),
            from_fallback,
            numbers: ball_stats(&numbers, NUMBER_MAX),
            stars: ball_stats(&stars, STAR_MAX),
        }
    }

    pub fn hot_numbers(&self, count: usize) -> Vec<u8> {
        hot(&self.numbers, count)
    }

    pub fn cold_numbers(&self, count: usize) -> Vec<u8> {
        cold(&self.numbers, count)
    }

    pub fn overdue_numbers(&self, count: usize) -> Vec<u8> {
        overdue(&self.numbers, count)
    }

    pub fn hot_stars(&self, count: usize) -> Vec<u8> {
        hot(&self.stars, count)
    }

    pub fn cold_stars(&self, count: usize) -> Vec<u8> {
        cold(&self.stars, count)
    }

    pub fn overdue_stars(&self, count: usize) -> Vec<u8> {
        overdue(&self.stars, count)
    }
}

fn ball_stats(history: &[&[u8]], max_ball: u8) -> Vec<BallStats> {
    let total = history.len();
    (1..=max_ball)
        .map(|ball| {
            let seen: Vec<usize> = history
                .iter()
                .enumerate()
                .filter(|(_, balls)| balls.contains(&ball))
                .map(|(index, _)| index)
                .collect();
            let frequency = seen.len();

            let mut max_gap = 0usize;
            let mut previous: Option<usize> = None;
            for index in &seen {
                let run = match previous {
                    Some(prev) => index - prev - 1,
                    None => *index,
                };
                max_gap = max_gap.max(run);
                previous = Some(*index);
            }
            let current_gap = previous.map(|last| total - 1 - last);
            max_gap = max_gap.max(current_gap.unwrap_or(total));

            let average_gap = if frequency == 0 {
                0.0
            } else {
                total as f64 / frequency as f64
            };
            let streak_score = match current_gap {
                Some(gap) if average_gap > 0.0 => gap as f64 / average_gap,
                _ => 0.0,
            };
            BallStats {
                ball,
                frequency: to_u32(frequency),
                last_seen_draws_ago: current_gap.map(to_u32),
                max_gap: to_u32(max_gap),
                average_gap,
                streak_score,
            }
        })
        .collect()
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn hot(stats: &[BallStats], count: usize) -> Vec<u8> {
    ranked(stats, count, |a, b| b.frequency.cmp(&a.frequency))
}

fn cold(stats: &[BallStats], count: usize) -> Vec<u8> {
    ranked(stats, count, |a, b| a.frequency.cmp(&b.frequency))
}

fn overdue(stats: &[BallStats], count: usize) -> Vec<u8> {
    ranked(stats, count, |a, b| {
        b.streak_score
            .partial_cmp(&a.streak_score)
            .unwrap_or(Ordering::Equal)
    })
}

/// Top `count` balls by `order`, ties broken by the smaller ball.
fn ranked(
    stats: &[BallStats],
    count: usize,
    order: impl Fn(&BallStats, &BallStats) -> Ordering,
) -> Vec<u8> {
    let mut sorted: Vec<&BallStats> = stats.iter().collect();
    sorted.sort_by(|a, b| order(a, b).then(a.ball.cmp(&b.ball)));
    sorted.into_iter().take(count).map(|stats| stats.ball).collect()
}

/// Matches of a grid against a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridCheck {
    pub matched_numbers: Vec<u8>,
    pub matched_stars: Vec<u8>,
    /// 1 (jackpot) to 13; `None` when the grid wins nothing.
    pub prize_rank: Option<u8>,
}

pub fn check_grid(numbers: &[u8], stars: &[u8], draw: &LotteryDraw) -> GridCheck {
    let matched_numbers: Vec<u8> = numbers
        .iter()
        .copied()
        .filter(|ball| draw.numbers.contains(ball))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let matched_stars: Vec<u8> = stars
        .iter()
        .copied()
        .filter(|ball| draw.stars.contains(ball))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    GridCheck {
        prize_rank: prize_rank(matched_numbers.len(), matched_stars.len()),
        matched_numbers,
        matched_stars,
    }
}

pub fn prize_rank(numbers: usize, stars: usize) -> Option<u8> {
    PRIZE_TABLE
        .iter()
        .position(|rank| *rank == (numbers, stars))
        .and_then(|index| u8::try_from(index + 1).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestStrategy {
    /// Most frequent balls.
    Hot,
    /// Highest streak scores.
    Overdue,
    /// Three hot and two overdue numbers, one star of each kind.
    Balanced,
}

impl SuggestStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Overdue => "overdue",
            Self::Balanced => "balanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hot" => Some(Self::Hot),
            "overdue" => Some(Self::Overdue),
            "balanced" => Some(Self::Balanced),
            _ => None,
        }
    }
}

/// Suggested balls, both sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedGrid {
    pub numbers: Vec<u8>,
    pub stars: Vec<u8>,
}

/// Deterministic grid for `strategy` over `stats`.
pub fn suggest_grid(stats: &LotteryStats, strategy: SuggestStrategy) -> SuggestedGrid {
    let (numbers, stars) = match strategy {
        SuggestStrategy::Hot => (
            stats.hot_numbers(NUMBER_COUNT),
            stats.hot_stars(STAR_COUNT),
        ),
        SuggestStrategy::Overdue => (
            stats.overdue_numbers(NUMBER_COUNT),
            stats.overdue_stars(STAR_COUNT),
        ),
        SuggestStrategy::Balanced => (
            pick_distinct(
                &[
                    (stats.hot_numbers(usize::from(NUMBER_MAX)), 3),
                    (stats.overdue_numbers(usize::from(NUMBER_MAX)), 2),
                ],
                NUMBER_COUNT,
                NUMBER_MAX,
            ),
            pick_distinct(
                &[
                    (stats.hot_stars(usize::from(STAR_MAX)), 1),
                    (stats.overdue_stars(usize::from(STAR_MAX)), 1),
                ],
                STAR_COUNT,
                STAR_MAX,
            ),
        ),
    };
    SuggestedGrid {
        numbers: sorted(numbers),
        stars: sorted(stars),
    }
}

/// Takes `quota` unused balls from each ranking in turn, then fills up
/// with the smallest unused balls.
fn pick_distinct(rankings: &[(Vec<u8>, usize)], wanted: usize, max_ball: u8) -> Vec<u8> {
    let mut picked: Vec<u8> = Vec::with_capacity(wanted);
    for (ranking, quota) in rankings {
        let mut taken = 0;
        for ball in ranking {
            if taken == *quota || picked.len() == wanted {
                break;
            }
            if !picked.contains(ball) {
                picked.push(*ball);
                taken += 1;
            }
        }
    }
    for ball in 1..=max_ball {
        if picked.len() == wanted {
            break;
        }
        if !picked.contains(&ball) {
            picked.push(ball);
        }
    }
    picked
}

fn sorted(mut balls: Vec<u8>) -> Vec<u8> {
    balls.sort_unstable();
    balls
}

/// Aggregate result of the virtual grids checked against known draws.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GridPerformance {
    pub grids_played: usize,
    /// Grids whose draw is known.
    pub grids_checked: usize,
    pub total_staked_cents: i64,
    pub winning_grids: usize,
    /// Winning grid count per prize rank.
    pub ranks: BTreeMap<u8, usize>,
}

pub struct LotteryService<L: LotteryRepository> {
    repo: L,
    stats_cache: TtlCache<LotteryStats>,
}

impl<L: LotteryRepository> LotteryService<L> {
    pub fn new(repo: L, cache_ttl: Duration) -> Self {
        Self {
            repo,
            stats_cache: TtlCache::new(cache_ttl),
        }
    }

    pub fn add_draw(&self, draw: LotteryDraw) -> AppResult<LotteryDraw> {
        self.repo.insert_draw(&draw)?;
        self.stats_cache.invalidate(STATS_KEY);
        info!("event=lottery_draw_add module=lottery status=ok");
        Ok(draw)
    }

    pub fn list_draws(&self, limit: Option<u32>) -> AppResult<Vec<LotteryDraw>> {
        Ok(self.repo.list_draws(limit)?)
    }

    pub fn latest_draw(&self) -> AppResult<Option<LotteryDraw>> {
        Ok(self.repo.latest_draw()?)
    }

    /// Imports `date,n1..n5,s1,s2` rows; dates already stored are skipped.
    /// Returns the number of new draws. Nothing is written on error.
    pub fn import_draws_csv(&self, text: &str) -> AppResult<usize> {
        let rows = read_rows(text, &DRAW_CSV_HEADER)?;
        let mut draws = Vec::with_capacity(rows.len());
        let mut seen_dates = BTreeSet::new();
        for (line, fields) in rows {
            let draw =
                parse_draw_fields(&fields).map_err(|message| AppError::Import { line, message })?;
            draw.validate().map_err(|err| AppError::Import {
                line,
                message: err.to_string(),
            })?;
            if !seen_dates.insert(draw.draw_date) {
                return Err(AppError::Import {
                    line,
                    message: format!("duplicate draw date {}", draw.draw_date),
                });
            }
            draws.push(draw);
        }
        let inserted = self.repo.insert_new_draws(&draws)?;
        self.stats_cache.invalidate(STATS_KEY);
        info!(
            "event=lottery_import module=lottery status=ok rows={} inserted={inserted}",
            draws.len()
        );
        Ok(inserted)
    }

    /// Statistics over the stored history, or the fallback dataset when
    /// the history is empty.
    pub fn stats(&self) -> AppResult<LotteryStats> {
        self.stats_cache
            .get_or_try_insert_with(STATS_KEY, || self.compute_stats())
    }

    fn compute_stats(&self) -> AppResult<LotteryStats> {
        let draws = self.repo.list_draws(None)?;
        if draws.is_empty() {
            info!("event=lottery_stats module=lottery status=ok source=fallback");
            return Ok(LotteryStats::compute(&fallback_draws(), true));
        }
        Ok(LotteryStats::compute(&draws, false))
    }

    pub fn suggest(&self, strategy: SuggestStrategy) -> AppResult<SuggestedGrid> {
        Ok(suggest_grid(&self.stats()?, strategy))
    }

    /// Checks a valid grid against the draw of `draw_date`.
    pub fn check(
        &self,
        numbers: &[u8],
        stars: &[u8],
        draw_date: NaiveDate,
    ) -> AppResult<GridCheck> {
        validate_grid_balls(numbers, stars)?;
        let draw = self
            .repo
            .get_draw_by_date(draw_date)?
            .ok_or_else(|| AppError::not_found("lottery_draw", draw_date))?;
        Ok(check_grid(numbers, stars, &draw))
    }

    pub fn save_grid(&self, grid: LotteryGrid) -> AppResult<LotteryGrid> {
        self.repo.insert_grid(&grid)?;
        info!(
            "event=lottery_grid_save module=lottery status=ok virtual={}",
            grid.is_virtual
        );
        Ok(grid)
    }

    pub fn grids_for_date(&self, draw_date: NaiveDate) -> AppResult<Vec<LotteryGrid>> {
        Ok(self.repo.list_grids_for_date(draw_date)?)
    }

    pub fn grid_performance(&self) -> AppResult<GridPerformance> {
        let mut performance = GridPerformance::default();
        let mut draws: BTreeMap<NaiveDate, Option<LotteryDraw>> = BTreeMap::new();
        for grid in self.repo.list_grids()? {
            performance.grids_played += 1;
            performance.total_staked_cents += grid.stake_cents;
            let draw = match draws.get(&grid.draw_date) {
                Some(cached) => cached.clone(),
                None => {
                    let loaded = self.repo.get_draw_by_date(grid.draw_date)?;
                    draws.insert(grid.draw_date, loaded.clone());
                    loaded
                }
            };
            let Some(draw) = draw else {
                continue;
            };
            performance.grids_checked += 1;
            if let Some(rank) = check_grid(&grid.numbers, &grid.stars, &draw).prize_rank {
                performance.winning_grids += 1;
                *performance.ranks.entry(rank).or_insert(0) += 1;
            }
        }
        Ok(performance)
    }
}

fn parse_draw_fields(fields: &[String]) -> Result<LotteryDraw, String> {
    let date_text = fields[0].trim();
    let draw_date = NaiveDate::parse_from_str(date_text, "%F")
        .map_err(|_| format!("invalid date `{date_text}`, expected YYYY-MM-DD"))?;
    let mut balls = Vec::with_capacity(NUMBER_COUNT + STAR_COUNT);
    for text in &fields[1..] {
        let ball = text
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid ball `{}`", text.trim()))?;
        balls.push(ball);
    }
    let stars = balls.split_off(NUMBER_COUNT);
    Ok(LotteryDraw::new(draw_date, balls, stars))
}

/// Built-in history used when no draw has been recorded yet.
pub fn fallback_draws() -> Vec<LotteryDraw> {
    const DATA: [(i32, u32, u32, [u8; 5], [u8; 2]); 12] = [
        (2024, 1, 2, [3, 17, 23, 38, 44], [2, 9]),
        (2024, 1, 5, [7, 12, 23, 31, 49], [4, 9]),
        (2024, 1, 9, [1, 17, 20, 35, 44], [3, 11]),
        (2024, 1, 12, [9, 14, 23, 27, 42], [2, 6]),
        (2024, 1, 16, [5, 17, 29, 38, 50], [8, 12]),
        (2024, 1, 19, [11, 19, 23, 40, 44], [1, 9]),
        (2024, 1, 23, [2, 13, 26, 38, 47], [5, 10]),
        (2024, 1, 26, [6, 17, 21, 33, 45], [2, 7]),
        (2024, 1, 30, [10, 23, 28, 36, 48], [3, 9]),
        (2024, 2, 2, [4, 15, 30, 38, 41], [6, 11]),
        (2024, 2, 6, [8, 17, 25, 34, 44], [2, 12]),
        (2024, 2, 9, [12, 18, 22, 39, 46], [1, 4]),
    ];
    DATA.iter()
        .filter_map(|(year, month, day, numbers, stars)| {
            NaiveDate::from_ymd_opt(*year, *month, *day)
                .map(|date| LotteryDraw::new(date, numbers.to_vec(), stars.to_vec()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn history() -> Vec<LotteryDraw> {
        vec![
            LotteryDraw::new(date(1), vec![1, 2, 3, 4, 5], vec![1, 2]),
            LotteryDraw::new(date(2), vec![1, 6, 7, 8, 9], vec![1, 3]),
            LotteryDraw::new(date(3), vec![1, 2, 10, 11, 12], vec![1, 4]),
            LotteryDraw::new(date(4), vec![13, 14, 15, 16, 17], vec![5, 6]),
        ]
    }

    fn ball(stats: &[BallStats], ball: u8) -> &BallStats {
        stats.iter().find(|stats| stats.ball == ball).unwrap()
    }

    #[test]
    fn gaps_and_streak_score_follow_chronology() {
        let mut draws = history();
        draws.reverse();
        let stats = LotteryStats::compute(&draws, false);
        assert_eq!(stats.draws_analyzed, 4);

        let one = ball(&stats.numbers, 1);
        assert_eq!(one.frequency, 3);
        assert_eq!(one.last_seen_draws_ago, Some(1));
        assert_eq!(one.max_gap, 1);

        let two = ball(&stats.numbers, 2);
        assert_eq!(two.frequency, 2);
        assert_eq!(two.average_gap, 2.0);
        assert_eq!(two.last_seen_draws_ago, Some(1));
        assert_eq!(two.max_gap, 1);
        assert_eq!(two.streak_score, 0.5);

        let five = ball(&stats.numbers, 5);
        assert_eq!(five.last_seen_draws_ago, Some(3));
        assert_eq!(five.streak_score, 3.0 / 4.0);

        let never = ball(&stats.numbers, 50);
        assert_eq!(never.frequency, 0);
        assert_eq!(never.last_seen_draws_ago, None);
        assert_eq!(never.max_gap, 4);
        assert_eq!(never.streak_score, 0.0);
    }

    #[test]
    fn hot_cold_and_overdue_rankings() {
        let stats = LotteryStats::compute(&history(), false);
        assert_eq!(stats.hot_numbers(2), vec![1, 2]);
        assert_eq!(stats.hot_stars(1), vec![1]);
        assert_eq!(stats.cold_numbers(1), vec![18]);
        // Balls 3, 4 and 5 were seen once, three draws ago.
        assert_eq!(stats.overdue_numbers(3), vec![3, 4, 5]);
    }

    #[test]
    fn prize_table_covers_thirteen_ranks() {
        assert_eq!(prize_rank(5, 2), Some(1));
        assert_eq!(prize_rank(4, 0), Some(7));
        assert_eq!(prize_rank(2, 2), Some(8));
        assert_eq!(prize_rank(2, 0), Some(13));
        assert_eq!(prize_rank(1, 1), None);
        assert_eq!(prize_rank(0, 2), None);
    }

    #[test]
    fn grid_check_reports_matches() {
        let draw = LotteryDraw::new(date(1), vec![1, 2, 3, 4, 5], vec![1, 2]);
        let check = check_grid(&[1, 2, 3, 40, 41], &[2, 9], &draw);
        assert_eq!(check.matched_numbers, vec![1, 2, 3]);
        assert_eq!(check.matched_stars, vec![2]);
        assert_eq!(check.prize_rank, Some(9));
    }

    #[test]
    fn balanced_suggestion_is_distinct_and_valid() {
        let stats = LotteryStats::compute(&history(), false);
        let grid = suggest_grid(&stats, SuggestStrategy::Balanced);
        assert_eq!(grid.numbers.len(), NUMBER_COUNT);
        assert_eq!(grid.stars.len(), STAR_COUNT);
        let draw = LotteryDraw::new(date(9), grid.numbers.clone(), grid.stars.clone());
        assert!(draw.validate().is_ok());
        assert!(grid.numbers.contains(&1));
        assert!(grid.numbers.contains(&3));
    }

    #[test]
    fn suggestions_are_deterministic() {
        let stats = LotteryStats::compute(&fallback_draws(), true);
        for strategy in [
            SuggestStrategy::Hot,
            SuggestStrategy::Overdue,
            SuggestStrategy::Balanced,
        ] {
            assert_eq!(suggest_grid(&stats, strategy), suggest_grid(&stats, strategy));
        }
    }

    #[test]
    fn fallback_dataset_is_valid() {
        let draws = fallback_draws();
        assert_eq!(draws.len(), 12);
        assert!(draws.iter().all(|draw| draw.validate().is_ok()));
    }
}
