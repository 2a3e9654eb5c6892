//! Batch-cooking session, step and preparation model.
//!
//! # Responsibility
//! - Encode the session and step lifecycles as guarded transitions.
//! - Compute preparation expiry from storage shelf life.
//!
//! # Invariants
//! - Session: `planned -> in_progress -> done`, or `cancelled` from
//!   `planned`/`in_progress`. Terminal states never change again.
//! - Step: `todo -> in_progress -> done`, or `skipped` from
//!   `todo`/`in_progress`.
//! - `finished_at >= started_at` whenever both are set.
//! - Preparation: `0 <= remaining_portions <= portions`,
//!   `expires_on >= prepared_on`.

use crate::model::recipe::RecipeId;
use crate::validation::{
    require_date_order, require_distinct, require_non_blank, require_positive, ValidationError,
    ValidationErrorKind,
};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type SessionId = Uuid;
pub type StepId = Uuid;
pub type PreparationId = Uuid;

const MS_PER_MINUTE: i64 = 60_000;

/// Lifecycle transition refused by the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub action: &'static str,
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot {} {} in status `{}`",
            self.action, self.entity, self.from
        )
    }
}

impl Error for TransitionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Planned,
    InProgress,
    Done,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planned" => Some(Self::Planned),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Todo,
    InProgress,
    Done,
    Skipped,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Fridge,
    Freezer,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fridge => "fridge",
            Self::Freezer => "freezer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fridge" => Some(Self::Fridge),
            "freezer" => Some(Self::Freezer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSession {
    pub id: SessionId,
    pub name: String,
    pub planned_date: NaiveDate,
    pub status: SessionStatus,
    pub recipe_ids: Vec<RecipeId>,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub notes: String,
}

impl BatchSession {
    pub fn new(
        name: impl Into<String>,
        planned_date: NaiveDate,
        recipe_ids: Vec<RecipeId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            planned_date,
            status: SessionStatus::Planned,
            recipe_ids,
            started_at: None,
            finished_at: None,
            notes: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("batch_session.name", &self.name)?;
        if self.recipe_ids.is_empty() {
            return Err(ValidationError::new(
                "batch_session.recipe_ids",
                ValidationErrorKind::Missing,
            ));
        }
        require_distinct("batch_session.recipe_ids", &self.recipe_ids)
    }

    pub fn start(&mut self, now: i64) -> Result<(), TransitionError> {
        self.guard("start", &[SessionStatus::Planned])?;
        self.status = SessionStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn finish(&mut self, now: i64) -> Result<(), TransitionError> {
        self.guard("finish", &[SessionStatus::InProgress])?;
        self.status = SessionStatus::Done;
        self.finished_at = Some(clamp_after(self.started_at, now));
        Ok(())
    }

    pub fn cancel(&mut self, now: i64) -> Result<(), TransitionError> {
        self.guard("cancel", &[SessionStatus::Planned, SessionStatus::InProgress])?;
        self.status = SessionStatus::Cancelled;
        self.finished_at = Some(clamp_after(self.started_at, now));
        Ok(())
    }

    /// Rejects `action` unless the session is in one of `allowed`.
    pub fn guard(
        &self,
        action: &'static str,
        allowed: &[SessionStatus],
    ) -> Result<(), TransitionError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(TransitionError {
            entity: "batch_session",
            from: self.status.as_str(),
            action,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStep {
    pub id: StepId,
    pub session_id: SessionId,
    /// 1-based order inside the session.
    pub position: u32,
    pub title: String,
    pub recipe_id: Option<RecipeId>,
    pub duration_minutes: u32,
    /// Steps sharing a group can run at the same time (oven, simmering).
    pub parallel_group: Option<u32>,
    pub status: StepStatus,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl BatchStep {
    pub fn new(
        session_id: SessionId,
        position: u32,
        title: impl Into<String>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            position,
            title: title.into(),
            recipe_id: None,
            duration_minutes,
            parallel_group: None,
            status: StepStatus::Todo,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("batch_step.title", &self.title)?;
        if self.position == 0 {
            return Err(ValidationError::new(
                "batch_step.position",
                ValidationErrorKind::NotPositive,
            ));
        }
        if self.duration_minutes == 0 {
            return Err(ValidationError::new(
                "batch_step.duration_minutes",
                ValidationErrorKind::NotPositive,
            ));
        }
        Ok(())
    }

    pub fn start(&mut self, now: i64) -> Result<(), TransitionError> {
        self.guard("start", &[StepStatus::Todo])?;
        self.status = StepStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn complete(&mut self, now: i64) -> Result<(), TransitionError> {
        self.guard("complete", &[StepStatus::InProgress])?;
        self.status = StepStatus::Done;
        self.finished_at = Some(clamp_after(self.started_at, now));
        Ok(())
    }

    pub fn skip(&mut self, now: i64) -> Result<(), TransitionError> {
        self.guard("skip", &[StepStatus::Todo, StepStatus::InProgress])?;
        self.status = StepStatus::Skipped;
        self.finished_at = Some(clamp_after(self.started_at, now));
        Ok(())
    }

    /// Wall-clock minutes spent on the step; runs until `now` while open.
    pub fn elapsed_minutes(&self, now: i64) -> Option<i64> {
        let started = self.started_at?;
        let end = self.finished_at.unwrap_or(now);
        Some((end - started).max(0) / MS_PER_MINUTE)
    }

    fn guard(&self, action: &'static str, allowed: &[StepStatus]) -> Result<(), TransitionError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(TransitionError {
            entity: "batch_step",
            from: self.status.as_str(),
            action,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preparation {
    pub id: PreparationId,
    pub session_id: SessionId,
    pub recipe_id: Option<RecipeId>,
    pub name: String,
    pub portions: u32,
    pub remaining_portions: u32,
    pub storage: StorageKind,
    pub prepared_on: NaiveDate,
    pub expires_on: NaiveDate,
}

impl Preparation {
    /// Creates a full preparation expiring `shelf_days` after `prepared_on`.
    pub fn new(
        session_id: SessionId,
        name: impl Into<String>,
        portions: u32,
        storage: StorageKind,
        prepared_on: NaiveDate,
        shelf_days: u32,
    ) -> Self {
        let expires_on = prepared_on
            .checked_add_days(Days::new(u64::from(shelf_days)))
            .unwrap_or(NaiveDate::MAX);
        Self {
            id: Uuid::new_v4(),
            session_id,
            recipe_id: None,
            name: name.into(),
            portions,
            remaining_portions: portions,
            storage,
            prepared_on,
            expires_on,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("preparation.name", &self.name)?;
        require_positive("preparation.portions", f64::from(self.portions))?;
        if self.remaining_portions > self.portions {
            return Err(ValidationError::new(
                "preparation.remaining_portions",
                ValidationErrorKind::OutOfRange {
                    min: 0.0,
                    max: f64::from(self.portions),
                },
            ));
        }
        require_date_order("preparation.expires_on", self.prepared_on, Some(self.expires_on))
    }

    /// Takes `portions` out of the remaining stock.
    pub fn consume(&mut self, portions: u32) -> Result<(), ValidationError> {
        if portions == 0 {
            return Err(ValidationError::new(
                "preparation.consume",
                ValidationErrorKind::NotPositive,
            ));
        }
        if portions > self.remaining_portions {
            return Err(ValidationError::new(
                "preparation.consume",
                ValidationErrorKind::OutOfRange {
                    min: 1.0,
                    max: f64::from(self.remaining_portions),
                },
            ));
        }
        self.remaining_portions -= portions;
        Ok(())
    }

    pub fn days_left(&self, today: NaiveDate) -> i64 {
        self.expires_on.signed_duration_since(today).num_days()
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.days_left(today) < 0
    }
}

fn clamp_after(started_at: Option<i64>, now: i64) -> i64 {
    started_at.map_or(now, |started| now.max(started))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn session_follows_planned_in_progress_done() {
        let mut session = BatchSession::new("Dimanche", day(4), vec![Uuid::new_v4()]);
        session.start(1_000).unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        session.finish(5_000).unwrap();
        assert_eq!(session.status, SessionStatus::Done);
        assert_eq!(session.finished_at, Some(5_000));

        let err = session.cancel(6_000).unwrap_err();
        assert_eq!(err.from, "done");
        assert_eq!(err.action, "cancel");
    }

    #[test]
    fn planned_session_cannot_finish() {
        let mut session = BatchSession::new("Dimanche", day(4), vec![Uuid::new_v4()]);
        assert!(session.finish(1).is_err());
        session.cancel(1).unwrap();
        assert!(session.status.is_terminal());
        assert!(session.start(2).is_err());
    }

    #[test]
    fn session_requires_distinct_recipes() {
        let id = Uuid::new_v4();
        assert!(BatchSession::new("x", day(1), vec![]).validate().is_err());
        assert!(BatchSession::new("x", day(1), vec![id, id]).validate().is_err());
        assert!(BatchSession::new("x", day(1), vec![id]).validate().is_ok());
    }

    #[test]
    fn step_timer_counts_wall_clock_minutes() {
        let mut step = BatchStep::new(Uuid::new_v4(), 1, "Éplucher", 15);
        assert_eq!(step.elapsed_minutes(0), None);
        step.start(60_000).unwrap();
        assert_eq!(step.elapsed_minutes(60_000 + 5 * 60_000), Some(5));
        step.complete(60_000 + 12 * 60_000).unwrap();
        assert_eq!(step.elapsed_minutes(i64::MAX / 2), Some(12));
    }

    #[test]
    fn step_cannot_complete_before_start_but_can_be_skipped() {
        let mut step = BatchStep::new(Uuid::new_v4(), 1, "Cuire", 30);
        let err = step.complete(10).unwrap_err();
        assert_eq!(err.entity, "batch_step");
        step.skip(10).unwrap();
        assert_eq!(step.status, StepStatus::Skipped);
        assert!(step.skip(11).is_err());
    }

    #[test]
    fn preparation_expiry_and_consumption() {
        let mut prep = Preparation::new(
            Uuid::new_v4(),
            "Bolognaise",
            6,
            StorageKind::Fridge,
            day(10),
            3,
        );
        assert_eq!(prep.expires_on, day(13));
        assert_eq!(prep.days_left(day(12)), 1);
        assert!(!prep.is_expired(day(13)));
        assert!(prep.is_expired(day(14)));

        prep.consume(4).unwrap();
        assert_eq!(prep.remaining_portions, 2);
        assert!(prep.consume(3).is_err());
        assert!(prep.consume(0).is_err());
        assert!(prep.validate().is_ok());
    }
}
