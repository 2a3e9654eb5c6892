//! Lottery and betting repository contracts and SQLite implementation.
//!
//! # Invariants
//! - One draw per calendar day; a second insert for the same day is a
//!   validation error, never a silent overwrite.
//! - Bets settle exactly once, from `pending`.

use crate::model::jeux::{Bet, BetId, BetOutcome, DrawId, GridId, LotteryDraw, LotteryGrid};
use crate::repo::{
    bool_to_int, ensure_tables, from_json, int_to_bool, parse_enum, parse_uuid, to_json,
    RepoError, RepoResult,
};
use crate::validation::{ValidationError, ValidationErrorKind};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const DRAW_SELECT_SQL: &str = "SELECT
    uuid,
    draw_date,
    numbers_json,
    stars_json,
    jackpot_cents
FROM lottery_draws";

const GRID_SELECT_SQL: &str = "SELECT
    uuid,
    draw_date,
    numbers_json,
    stars_json,
    stake_cents,
    is_virtual,
    created_at
FROM lottery_grids";

const BET_SELECT_SQL: &str = "SELECT
    uuid,
    placed_on,
    event,
    market,
    selection,
    odds,
    stake_cents,
    outcome
FROM bets";

pub trait LotteryRepository {
    fn insert_draw(&self, draw: &LotteryDraw) -> RepoResult<DrawId>;
    /// Inserts draws whose date is not stored yet, in one transaction.
    /// Returns how many rows were added.
    fn insert_new_draws(&self, draws: &[LotteryDraw]) -> RepoResult<usize>;
    /// Draws by date descending; `limit = None` returns the full history.
    fn list_draws(&self, limit: Option<u32>) -> RepoResult<Vec<LotteryDraw>>;
    fn latest_draw(&self) -> RepoResult<Option<LotteryDraw>>;
    fn get_draw_by_date(&self, draw_date: NaiveDate) -> RepoResult<Option<LotteryDraw>>;
    fn count_draws(&self) -> RepoResult<u64>;

    fn insert_grid(&self, grid: &LotteryGrid) -> RepoResult<GridId>;
    fn list_grids_for_date(&self, draw_date: NaiveDate) -> RepoResult<Vec<LotteryGrid>>;
    fn list_grids(&self) -> RepoResult<Vec<LotteryGrid>>;
}

pub trait BetRepository {
    fn create_bet(&self, bet: &Bet) -> RepoResult<BetId>;
    fn get_bet(&self, id: BetId) -> RepoResult<Option<Bet>>;
    /// Bets by `placed_on ASC`, optionally restricted to one market.
    fn list_bets(&self, market: Option<&str>) -> RepoResult<Vec<Bet>>;
    /// Moves a pending bet to its final outcome.
    fn settle_bet(&self, id: BetId, outcome: BetOutcome) -> RepoResult<Bet>;
}

pub struct SqliteJeuxRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteJeuxRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["lottery_draws", "lottery_grids", "bets"])?;
        Ok(Self { conn })
    }

    fn write_draw(&self, draw: &LotteryDraw) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO lottery_draws (uuid, draw_date, numbers_json, stars_json, jackpot_cents)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                draw.id.to_string(),
                draw.draw_date,
                to_json(&draw.numbers)?,
                to_json(&draw.stars)?,
                draw.jackpot_cents,
            ],
        )?;
        Ok(())
    }

    fn query_draws(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<LotteryDraw>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut draws = Vec::new();
        while let Some(row) = rows.next()? {
            draws.push(parse_draw_row(row)?);
        }
        Ok(draws)
    }

    fn query_grids(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<LotteryGrid>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut grids = Vec::new();
        while let Some(row) = rows.next()? {
            grids.push(parse_grid_row(row)?);
        }
        Ok(grids)
    }
}

impl LotteryRepository for SqliteJeuxRepository<'_> {
    fn insert_draw(&self, draw: &LotteryDraw) -> RepoResult<DrawId> {
        draw.validate()?;
        if self.get_draw_by_date(draw.draw_date)?.is_some() {
            return Err(RepoError::Validation(ValidationError::new(
                "lottery_draw.draw_date",
                ValidationErrorKind::Duplicate(draw.draw_date.to_string()),
            )));
        }
        self.write_draw(draw)?;
        Ok(draw.id)
    }

    fn insert_new_draws(&self, draws: &[LotteryDraw]) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        for draw in draws {
            draw.validate()?;
            if self.get_draw_by_date(draw.draw_date)?.is_some() {
                continue;
            }
            self.write_draw(draw)?;
            inserted += 1;
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn list_draws(&self, limit: Option<u32>) -> RepoResult<Vec<LotteryDraw>> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, i64::from);
        self.query_draws(
            &format!("{DRAW_SELECT_SQL} ORDER BY draw_date DESC LIMIT ?1;"),
            [limit],
        )
    }

    fn latest_draw(&self) -> RepoResult<Option<LotteryDraw>> {
        Ok(self.list_draws(Some(1))?.into_iter().next())
    }

    fn get_draw_by_date(&self, draw_date: NaiveDate) -> RepoResult<Option<LotteryDraw>> {
        self.conn
            .query_row(
                &format!("{DRAW_SELECT_SQL} WHERE draw_date = ?1;"),
                [draw_date],
                |row| Ok(parse_draw_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn count_draws(&self) -> RepoResult<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM lottery_draws;", [], |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    fn insert_grid(&self, grid: &LotteryGrid) -> RepoResult<GridId> {
        grid.validate()?;
        self.conn.execute(
            "INSERT INTO lottery_grids (
                uuid,
                draw_date,
                numbers_json,
                stars_json,
                stake_cents,
                is_virtual,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                grid.id.to_string(),
                grid.draw_date,
                to_json(&grid.numbers)?,
                to_json(&grid.stars)?,
                grid.stake_cents,
                bool_to_int(grid.is_virtual),
                grid.created_at,
            ],
        )?;
        Ok(grid.id)
    }

    fn list_grids_for_date(&self, draw_date: NaiveDate) -> RepoResult<Vec<LotteryGrid>> {
        self.query_grids(
            &format!("{GRID_SELECT_SQL} WHERE draw_date = ?1 ORDER BY created_at ASC, uuid ASC;"),
            [draw_date],
        )
    }

    fn list_grids(&self) -> RepoResult<Vec<LotteryGrid>> {
        self.query_grids(
            &format!("{GRID_SELECT_SQL} ORDER BY draw_date ASC, created_at ASC, uuid ASC;"),
            [],
        )
    }
}

impl BetRepository for SqliteJeuxRepository<'_> {
    fn create_bet(&self, bet: &Bet) -> RepoResult<BetId> {
        bet.validate()?;
        self.conn.execute(
            "INSERT INTO bets (
                uuid,
                placed_on,
                event,
                market,
                selection,
                odds,
                stake_cents,
                outcome
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                bet.id.to_string(),
                bet.placed_on,
                bet.event.trim(),
                bet.market.trim(),
                bet.selection.trim(),
                bet.odds,
                bet.stake_cents,
                bet.outcome.as_str(),
            ],
        )?;
        Ok(bet.id)
    }

    fn get_bet(&self, id: BetId) -> RepoResult<Option<Bet>> {
        self.conn
            .query_row(
                &format!("{BET_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_bet_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_bets(&self, market: Option<&str>) -> RepoResult<Vec<Bet>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BET_SELECT_SQL}
             WHERE (?1 IS NULL OR market = ?1 COLLATE NOCASE)
             ORDER BY placed_on ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([market.map(str::trim)])?;
        let mut bets = Vec::new();
        while let Some(row) = rows.next()? {
            bets.push(parse_bet_row(row)?);
        }
        Ok(bets)
    }

    fn settle_bet(&self, id: BetId, outcome: BetOutcome) -> RepoResult<Bet> {
        if outcome == BetOutcome::Pending {
            return Err(RepoError::Validation(ValidationError::invalid(
                "bet.outcome",
                "a bet cannot be settled as pending",
            )));
        }
        let changed = self.conn.execute(
            "UPDATE bets SET outcome = ?1 WHERE uuid = ?2 AND outcome = 'pending';",
            params![outcome.as_str(), id.to_string()],
        )?;
        let bet = self.get_bet(id)?.ok_or(RepoError::NotFound { entity: "bet", id })?;
        if changed == 0 {
            return Err(RepoError::Validation(ValidationError::invalid(
                "bet.outcome",
                format!("bet already settled as {}", bet.outcome.as_str()),
            )));
        }
        Ok(bet)
    }
}

fn parse_draw_row(row: &Row<'_>) -> RepoResult<LotteryDraw> {
    let uuid_text: String = row.get("uuid")?;
    let numbers_text: String = row.get("numbers_json")?;
    let stars_text: String = row.get("stars_json")?;
    let draw = LotteryDraw {
        id: parse_uuid("lottery_draws.uuid", &uuid_text)?,
        draw_date: row.get("draw_date")?,
        numbers: from_json("lottery_draws.numbers_json", &numbers_text)?,
        stars: from_json("lottery_draws.stars_json", &stars_text)?,
        jackpot_cents: row.get("jackpot_cents")?,
    };
    draw.validate()?;
    Ok(draw)
}

fn parse_grid_row(row: &Row<'_>) -> RepoResult<LotteryGrid> {
    let uuid_text: String = row.get("uuid")?;
    let numbers_text: String = row.get("numbers_json")?;
    let stars_text: String = row.get("stars_json")?;
    let grid = LotteryGrid {
        id: parse_uuid("lottery_grids.uuid", &uuid_text)?,
        draw_date: row.get("draw_date")?,
        numbers: from_json("lottery_grids.numbers_json", &numbers_text)?,
        stars: from_json("lottery_grids.stars_json", &stars_text)?,
        stake_cents: row.get("stake_cents")?,
        is_virtual: int_to_bool("lottery_grids.is_virtual", row.get("is_virtual")?)?,
        created_at: row.get("created_at")?,
    };
    grid.validate()?;
    Ok(grid)
}

fn parse_bet_row(row: &Row<'_>) -> RepoResult<Bet> {
    let uuid_text: String = row.get("uuid")?;
    let outcome_text: String = row.get("outcome")?;
    let bet = Bet {
        id: parse_uuid("bets.uuid", &uuid_text)?,
        placed_on: row.get("placed_on")?,
        event: row.get("event")?,
        market: row.get("market")?,
        selection: row.get("selection")?,
        odds: row.get("odds")?,
        stake_cents: row.get("stake_cents")?,
        outcome: parse_enum("bets.outcome", &outcome_text, BetOutcome::parse)?,
    };
    bet.validate()?;
    Ok(bet)
}
