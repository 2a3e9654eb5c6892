//! Batch-cooking session use-cases.
//!
//! # Responsibility
//! - Create sessions over existing recipes and plan their steps.
//! - Drive the session and step lifecycles with explicit clock values.
//! - Track stored preparations and their shelf life.
//!
//! # Invariants
//! - Steps only start or complete while their session is in progress.
//! - Finishing a session closes every open step as skipped, atomically.
//! - Preparation expiry derives from the configured shelf life of its
//!   storage kind.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::model::batch::{
    BatchSession, BatchStep, Preparation, PreparationId, SessionId, SessionStatus, StepId,
    StepStatus, StorageKind, TransitionError,
};
use crate::model::recipe::{Recipe, RecipeId};
use crate::repo::batch_repo::BatchRepository;
use crate::repo::recipe_repo::RecipeRepository;
use crate::service::planner::{run_planner, StepPlanner};
use crate::validation::{require_non_blank, ValidationError};
use chrono::{Days, NaiveDate};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;

const MS_PER_MINUTE: i64 = 60_000;

/// Shelf life in days per storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShelfLife {
    pub fridge_days: u32,
    pub freezer_days: u32,
}

impl ShelfLife {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fridge_days: config.fridge_shelf_days,
            freezer_days: config.freezer_shelf_days,
        }
    }

    pub fn days_for(&self, storage: StorageKind) -> u32 {
        match storage {
            StorageKind::Fridge => self.fridge_days,
            StorageKind::Freezer => self.freezer_days,
        }
    }
}

impl Default for ShelfLife {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Manual step description for [`BatchService::add_step`].
#[derive(Debug, Clone, Default)]
pub struct NewStep {
    pub title: String,
    pub duration_minutes: u32,
    pub recipe_id: Option<RecipeId>,
    pub parallel_group: Option<u32>,
}

/// Snapshot of a session's advancement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub total_steps: usize,
    /// Steps done or skipped.
    pub closed_steps: usize,
    /// `closed_steps / total_steps`, `0.0` without steps.
    pub ratio: f64,
    /// Estimated minutes left; steps of a parallel group overlap, so only
    /// the longest remaining one of each group counts.
    pub remaining_minutes: u32,
}

pub struct BatchService<B: BatchRepository, R: RecipeRepository> {
    batch: B,
    recipes: R,
    shelf_life: ShelfLife,
}

impl<B: BatchRepository, R: RecipeRepository> BatchService<B, R> {
    pub fn new(batch: B, recipes: R, shelf_life: ShelfLife) -> Self {
        Self {
            batch,
            recipes,
            shelf_life,
        }
    }

    /// Creates a planned session over active recipes.
    pub fn create_session(
        &self,
        name: &str,
        planned_date: NaiveDate,
        recipe_ids: Vec<RecipeId>,
    ) -> AppResult<BatchSession> {
        let session = BatchSession::new(name.trim(), planned_date, recipe_ids);
        session.validate()?;
        self.load_recipes(&session.recipe_ids)?;
        self.batch.create_session(&session)?;
        info!(
            "event=batch_session_create module=batch status=ok recipes={}",
            session.recipe_ids.len()
        );
        Ok(session)
    }

    pub fn get_session(&self, id: SessionId) -> AppResult<BatchSession> {
        self.batch
            .get_session(id)?
            .ok_or_else(|| AppError::not_found("batch_session", id))
    }

    pub fn list_sessions(&self, status: Option<SessionStatus>) -> AppResult<Vec<BatchSession>> {
        Ok(self.batch.list_sessions(status)?)
    }

    /// Replaces the steps of a planned session with the planner output,
    /// numbered from 1.
    pub fn plan_steps(
        &self,
        session_id: SessionId,
        planner: &impl StepPlanner,
    ) -> AppResult<Vec<BatchStep>> {
        let session = self.get_session(session_id)?;
        session.guard("plan", &[SessionStatus::Planned])?;
        let recipes = self.load_recipes(&session.recipe_ids)?;
        let planned = run_planner(planner, &recipes)?;

        let steps: Vec<BatchStep> = planned
            .into_iter()
            .zip(1u32..)
            .map(|(planned, position)| {
                let mut step = BatchStep::new(
                    session_id,
                    position,
                    planned.title,
                    planned.duration_minutes,
                );
                step.recipe_id = planned.recipe_id;
                step.parallel_group = planned.parallel_group;
                step
            })
            .collect();
        self.batch.replace_steps(session_id, &steps)?;
        Ok(steps)
    }

    /// Appends a manual step at the end of the session.
    pub fn add_step(&self, session_id: SessionId, new_step: NewStep) -> AppResult<BatchStep> {
        let session = self.get_session(session_id)?;
        session.guard("add_step", &[SessionStatus::Planned, SessionStatus::InProgress])?;
        require_non_blank("batch_step.title", &new_step.title)?;
        let position = self.batch.next_step_position(session_id)?;
        let mut step = BatchStep::new(
            session_id,
            position,
            new_step.title.trim(),
            new_step.duration_minutes,
        );
        step.recipe_id = new_step.recipe_id;
        step.parallel_group = new_step.parallel_group;
        self.batch.create_step(&step)?;
        Ok(step)
    }

    pub fn list_steps(&self, session_id: SessionId) -> AppResult<Vec<BatchStep>> {
        self.get_session(session_id)?;
        Ok(self.batch.list_steps(session_id)?)
    }

    pub fn start_session(&self, session_id: SessionId, now: i64) -> AppResult<BatchSession> {
        let mut session = self.get_session(session_id)?;
        session.start(now)?;
        self.batch.update_session(&session)?;
        info!("event=batch_session_start module=batch status=ok");
        Ok(session)
    }

    /// Marks the session done; open steps are closed as skipped.
    pub fn finish_session(&self, session_id: SessionId, now: i64) -> AppResult<BatchSession> {
        let mut session = self.get_session(session_id)?;
        session.finish(now)?;
        let mut skipped = Vec::new();
        for mut step in self.batch.list_steps(session_id)? {
            if !step.status.is_closed() {
                step.skip(now)?;
                skipped.push(step);
            }
        }
        self.batch.save_session_with_steps(&session, &skipped)?;
        info!(
            "event=batch_session_finish module=batch status=ok skipped_steps={}",
            skipped.len()
        );
        Ok(session)
    }

    pub fn cancel_session(&self, session_id: SessionId, now: i64) -> AppResult<BatchSession> {
        let mut session = self.get_session(session_id)?;
        session.cancel(now)?;
        self.batch.update_session(&session)?;
        info!("event=batch_session_cancel module=batch status=ok");
        Ok(session)
    }

    pub fn start_step(&self, step_id: StepId, now: i64) -> AppResult<BatchStep> {
        self.transition_step(step_id, "start_step", &[SessionStatus::InProgress], |step| {
            step.start(now)
        })
    }

    pub fn complete_step(&self, step_id: StepId, now: i64) -> AppResult<BatchStep> {
        self.transition_step(step_id, "complete_step", &[SessionStatus::InProgress], |step| {
            step.complete(now)
        })
    }

    pub fn skip_step(&self, step_id: StepId, now: i64) -> AppResult<BatchStep> {
        self.transition_step(
            step_id,
            "skip_step",
            &[SessionStatus::Planned, SessionStatus::InProgress],
            |step| step.skip(now),
        )
    }

    /// Wall-clock minutes spent on a step; `None` before it starts.
    pub fn step_elapsed_minutes(&self, step_id: StepId, now: i64) -> AppResult<Option<i64>> {
        Ok(self.get_step(step_id)?.elapsed_minutes(now))
    }

    pub fn session_progress(&self, session_id: SessionId, now: i64) -> AppResult<SessionProgress> {
        let steps = self.list_steps(session_id)?;
        Ok(compute_progress(&steps, now))
    }

    /// Records a preparation produced by the session.
    pub fn store_preparation(
        &self,
        session_id: SessionId,
        name: &str,
        portions: u32,
        storage: StorageKind,
        prepared_on: NaiveDate,
        recipe_id: Option<RecipeId>,
    ) -> AppResult<Preparation> {
        let session = self.get_session(session_id)?;
        session.guard("store", &[SessionStatus::InProgress, SessionStatus::Done])?;
        if let Some(recipe_id) = recipe_id {
            if !session.recipe_ids.contains(&recipe_id) {
                return Err(ValidationError::invalid(
                    "preparation.recipe_id",
                    "recipe is not part of the session",
                )
                .into());
            }
        }
        let mut preparation = Preparation::new(
            session_id,
            name.trim(),
            portions,
            storage,
            prepared_on,
            self.shelf_life.days_for(storage),
        );
        preparation.recipe_id = recipe_id;
        self.batch.create_preparation(&preparation)?;
        info!(
            "event=batch_preparation_store module=batch status=ok storage={} portions={portions}",
            storage.as_str()
        );
        Ok(preparation)
    }

    pub fn consume_portions(
        &self,
        preparation_id: PreparationId,
        portions: u32,
    ) -> AppResult<Preparation> {
        let mut preparation = self
            .batch
            .get_preparation(preparation_id)?
            .ok_or_else(|| AppError::not_found("preparation", preparation_id))?;
        preparation.consume(portions)?;
        self.batch.update_preparation(&preparation)?;
        Ok(preparation)
    }

    pub fn list_preparations(&self, session_id: Option<SessionId>) -> AppResult<Vec<Preparation>> {
        Ok(self.batch.list_preparations(session_id)?)
    }

    /// Preparations with portions left expiring within `within_days` of
    /// `today` (already expired ones included), soonest first.
    pub fn expiring_preparations(
        &self,
        today: NaiveDate,
        within_days: u32,
    ) -> AppResult<Vec<Preparation>> {
        let until = today
            .checked_add_days(Days::new(u64::from(within_days)))
            .unwrap_or(NaiveDate::MAX);
        Ok(self.batch.list_expiring_preparations(until)?)
    }

    fn get_step(&self, step_id: StepId) -> AppResult<BatchStep> {
        self.batch
            .get_step(step_id)?
            .ok_or_else(|| AppError::not_found("batch_step", step_id))
    }

    fn transition_step(
        &self,
        step_id: StepId,
        action: &'static str,
        allowed: &[SessionStatus],
        apply: impl FnOnce(&mut BatchStep) -> Result<(), TransitionError>,
    ) -> AppResult<BatchStep> {
        let mut step = self.get_step(step_id)?;
        let session = self.get_session(step.session_id)?;
        session.guard(action, allowed)?;
        apply(&mut step)?;
        self.batch.update_step(&step)?;
        info!(
            "event=batch_step_transition module=batch status=ok action={action} to={}",
            step.status.as_str()
        );
        Ok(step)
    }

    fn load_recipes(&self, recipe_ids: &[RecipeId]) -> AppResult<Vec<Recipe>> {
        recipe_ids
            .iter()
            .map(|id| {
                self.recipes
                    .get_recipe(*id, false)?
                    .ok_or_else(|| AppError::not_found("recipe", id))
            })
            .collect()
    }
}

/// Progress over `steps` at instant `now`.
pub fn compute_progress(steps: &[BatchStep], now: i64) -> SessionProgress {
    let total_steps = steps.len();
    let closed_steps = steps.iter().filter(|step| step.status.is_closed()).count();
    let ratio = if total_steps == 0 {
        0.0
    } else {
        closed_steps as f64 / total_steps as f64
    };

    let mut sequential_minutes: u32 = 0;
    let mut group_minutes: BTreeMap<u32, u32> = BTreeMap::new();
    for step in steps.iter().filter(|step| !step.status.is_closed()) {
        let left = remaining_step_minutes(step, now);
        match step.parallel_group {
            Some(group) => {
                let longest = group_minutes.entry(group).or_insert(0);
                *longest = (*longest).max(left);
            }
            None => sequential_minutes = sequential_minutes.saturating_add(left),
        }
    }
    let remaining_minutes = group_minutes
        .values()
        .fold(sequential_minutes, |acc, minutes| acc.saturating_add(*minutes));

    SessionProgress {
        total_steps,
        closed_steps,
        ratio,
        remaining_minutes,
    }
}

fn remaining_step_minutes(step: &BatchStep, now: i64) -> u32 {
    match (step.status, step.started_at) {
        (StepStatus::InProgress, Some(started)) => {
            let elapsed = ((now - started).max(0) / MS_PER_MINUTE).min(i64::from(u32::MAX));
            step.duration_minutes
                .saturating_sub(u32::try_from(elapsed).unwrap_or(u32::MAX))
        }
        _ => step.duration_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_progress, ShelfLife};
    use crate::model::batch::{BatchStep, StepStatus, StorageKind};
    use uuid::Uuid;

    fn step(position: u32, minutes: u32, group: Option<u32>) -> BatchStep {
        let mut step = BatchStep::new(Uuid::nil(), position, format!("étape {position}"), minutes);
        step.parallel_group = group;
        step
    }

    #[test]
    fn parallel_group_counts_its_longest_step_only() {
        let steps = vec![
            step(1, 10, None),
            step(2, 45, Some(1)),
            step(3, 30, Some(1)),
            step(4, 15, None),
        ];
        let progress = compute_progress(&steps, 0);
        assert_eq!(progress.total_steps, 4);
        assert_eq!(progress.closed_steps, 0);
        assert_eq!(progress.remaining_minutes, 10 + 45 + 15);
    }

    #[test]
    fn closed_and_running_steps_reduce_remaining_time() {
        let mut steps = vec![step(1, 10, None), step(2, 20, None)];
        steps[0].status = StepStatus::Done;
        steps[1].start(0).unwrap();
        let progress = compute_progress(&steps, 5 * 60_000);
        assert_eq!(progress.closed_steps, 1);
        assert_eq!(progress.ratio, 0.5);
        assert_eq!(progress.remaining_minutes, 15);
    }

    #[test]
    fn empty_session_has_zero_ratio() {
        let progress = compute_progress(&[], 0);
        assert_eq!(progress.ratio, 0.0);
        assert_eq!(progress.remaining_minutes, 0);
    }

    #[test]
    fn shelf_life_defaults() {
        let shelf = ShelfLife::default();
        assert_eq!(shelf.days_for(StorageKind::Fridge), 3);
        assert_eq!(shelf.days_for(StorageKind::Freezer), 90);
    }
}
