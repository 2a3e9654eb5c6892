//! Batch-cooking repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist sessions, their ordered steps and stored preparations.
//! - Offer multi-row writes (step replacement, session close) atomically.
//!
//! # Invariants
//! - Steps are listed by `position ASC`; positions are unique per session.
//! - Status columns always hold a known lifecycle value.

use crate::model::batch::{
    BatchSession, BatchStep, Preparation, PreparationId, SessionId, SessionStatus, StepId,
    StepStatus, StorageKind,
};
use crate::repo::{
    ensure_tables, from_json, parse_enum, parse_optional_uuid, parse_uuid, to_json, RepoError,
    RepoResult,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SESSION_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    planned_date,
    status,
    recipe_ids_json,
    started_at,
    finished_at,
    notes
FROM batch_sessions";

const STEP_SELECT_SQL: &str = "SELECT
    uuid,
    session_uuid,
    position,
    title,
    recipe_uuid,
    duration_minutes,
    parallel_group,
    status,
    started_at,
    finished_at
FROM batch_steps";

const PREPARATION_SELECT_SQL: &str = "SELECT
    uuid,
    session_uuid,
    recipe_uuid,
    name,
    portions,
    remaining_portions,
    storage,
    prepared_on,
    expires_on
FROM batch_preparations";

pub trait BatchRepository {
    fn create_session(&self, session: &BatchSession) -> RepoResult<SessionId>;
    fn update_session(&self, session: &BatchSession) -> RepoResult<()>;
    fn get_session(&self, id: SessionId) -> RepoResult<Option<BatchSession>>;
    fn list_sessions(&self, status: Option<SessionStatus>) -> RepoResult<Vec<BatchSession>>;
    /// Updates the session and the given steps in one transaction.
    fn save_session_with_steps(
        &self,
        session: &BatchSession,
        steps: &[BatchStep],
    ) -> RepoResult<()>;

    /// Replaces every step of the session in one transaction.
    fn replace_steps(&self, session_id: SessionId, steps: &[BatchStep]) -> RepoResult<()>;
    fn create_step(&self, step: &BatchStep) -> RepoResult<StepId>;
    fn update_step(&self, step: &BatchStep) -> RepoResult<()>;
    fn get_step(&self, id: StepId) -> RepoResult<Option<BatchStep>>;
    fn list_steps(&self, session_id: SessionId) -> RepoResult<Vec<BatchStep>>;
    fn next_step_position(&self, session_id: SessionId) -> RepoResult<u32>;

    fn create_preparation(&self, preparation: &Preparation) -> RepoResult<PreparationId>;
    fn update_preparation(&self, preparation: &Preparation) -> RepoResult<()>;
    fn get_preparation(&self, id: PreparationId) -> RepoResult<Option<Preparation>>;
    fn list_preparations(&self, session_id: Option<SessionId>) -> RepoResult<Vec<Preparation>>;
    /// Preparations with portions left expiring on or before `until`.
    fn list_expiring_preparations(&self, until: NaiveDate) -> RepoResult<Vec<Preparation>>;
}

pub struct SqliteBatchRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBatchRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &["batch_sessions", "batch_steps", "batch_preparations"],
        )?;
        Ok(Self { conn })
    }

    fn write_session(&self, session: &BatchSession) -> RepoResult<()> {
        session.validate()?;
        let changed = self.conn.execute(
            "UPDATE batch_sessions
             SET
                name = ?1,
                planned_date = ?2,
                status = ?3,
                recipe_ids_json = ?4,
                started_at = ?5,
                finished_at = ?6,
                notes = ?7
             WHERE uuid = ?8;",
            params![
                session.name.trim(),
                session.planned_date,
                session.status.as_str(),
                to_json(&session.recipe_ids)?,
                session.started_at,
                session.finished_at,
                session.notes.as_str(),
                session.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "batch_session",
                id: session.id,
            });
        }
        Ok(())
    }

    fn insert_step(&self, step: &BatchStep) -> RepoResult<()> {
        step.validate()?;
        self.conn.execute(
            "INSERT INTO batch_steps (
                uuid,
                session_uuid,
                position,
                title,
                recipe_uuid,
                duration_minutes,
                parallel_group,
                status,
                started_at,
                finished_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                step.id.to_string(),
                step.session_id.to_string(),
                step.position,
                step.title.trim(),
                step.recipe_id.map(|id| id.to_string()),
                step.duration_minutes,
                step.parallel_group,
                step.status.as_str(),
                step.started_at,
                step.finished_at,
            ],
        )?;
        Ok(())
    }

    fn write_step(&self, step: &BatchStep) -> RepoResult<()> {
        step.validate()?;
        let changed = self.conn.execute(
            "UPDATE batch_steps
             SET
                position = ?1,
                title = ?2,
                recipe_uuid = ?3,
                duration_minutes = ?4,
                parallel_group = ?5,
                status = ?6,
                started_at = ?7,
                finished_at = ?8
             WHERE uuid = ?9;",
            params![
                step.position,
                step.title.trim(),
                step.recipe_id.map(|id| id.to_string()),
                step.duration_minutes,
                step.parallel_group,
                step.status.as_str(),
                step.started_at,
                step.finished_at,
                step.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "batch_step",
                id: step.id,
            });
        }
        Ok(())
    }

    fn query_preparations(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<Preparation>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut preparations = Vec::new();
        while let Some(row) = rows.next()? {
            preparations.push(parse_preparation_row(row)?);
        }
        Ok(preparations)
    }
}

impl BatchRepository for SqliteBatchRepository<'_> {
    fn create_session(&self, session: &BatchSession) -> RepoResult<SessionId> {
        session.validate()?;
        self.conn.execute(
            "INSERT INTO batch_sessions (
                uuid,
                name,
                planned_date,
                status,
                recipe_ids_json,
                started_at,
                finished_at,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                session.id.to_string(),
                session.name.trim(),
                session.planned_date,
                session.status.as_str(),
                to_json(&session.recipe_ids)?,
                session.started_at,
                session.finished_at,
                session.notes.as_str(),
            ],
        )?;
        Ok(session.id)
    }

    fn update_session(&self, session: &BatchSession) -> RepoResult<()> {
        self.write_session(session)
    }

    fn get_session(&self, id: SessionId) -> RepoResult<Option<BatchSession>> {
        self.conn
            .query_row(
                &format!("{SESSION_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_session_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_sessions(&self, status: Option<SessionStatus>) -> RepoResult<Vec<BatchSession>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SESSION_SELECT_SQL}
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY planned_date DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([status.map(SessionStatus::as_str)])?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(parse_session_row(row)?);
        }
        Ok(sessions)
    }

    fn save_session_with_steps(
        &self,
        session: &BatchSession,
        steps: &[BatchStep],
    ) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.write_session(session)?;
        for step in steps {
            self.write_step(step)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn replace_steps(&self, session_id: SessionId, steps: &[BatchStep]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            "DELETE FROM batch_steps WHERE session_uuid = ?1;",
            [session_id.to_string()],
        )?;
        for step in steps {
            if step.session_id != session_id {
                return Err(RepoError::InvalidData(format!(
                    "step {} belongs to another session",
                    step.id
                )));
            }
            self.insert_step(step)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn create_step(&self, step: &BatchStep) -> RepoResult<StepId> {
        self.insert_step(step)?;
        Ok(step.id)
    }

    fn update_step(&self, step: &BatchStep) -> RepoResult<()> {
        self.write_step(step)
    }

    fn get_step(&self, id: StepId) -> RepoResult<Option<BatchStep>> {
        self.conn
            .query_row(
                &format!("{STEP_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_step_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_steps(&self, session_id: SessionId) -> RepoResult<Vec<BatchStep>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STEP_SELECT_SQL} WHERE session_uuid = ?1 ORDER BY position ASC;"
        ))?;
        let mut rows = stmt.query([session_id.to_string()])?;
        let mut steps = Vec::new();
        while let Some(row) = rows.next()? {
            steps.push(parse_step_row(row)?);
        }
        Ok(steps)
    }

    fn next_step_position(&self, session_id: SessionId) -> RepoResult<u32> {
        let max: Option<u32> = self.conn.query_row(
            "SELECT MAX(position) FROM batch_steps WHERE session_uuid = ?1;",
            [session_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) + 1)
    }

    fn create_preparation(&self, preparation: &Preparation) -> RepoResult<PreparationId> {
        preparation.validate()?;
        self.conn.execute(
            "INSERT INTO batch_preparations (
                uuid,
                session_uuid,
                recipe_uuid,
                name,
                portions,
                remaining_portions,
                storage,
                prepared_on,
                expires_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                preparation.id.to_string(),
                preparation.session_id.to_string(),
                preparation.recipe_id.map(|id| id.to_string()),
                preparation.name.trim(),
                preparation.portions,
                preparation.remaining_portions,
                preparation.storage.as_str(),
                preparation.prepared_on,
                preparation.expires_on,
            ],
        )?;
        Ok(preparation.id)
    }

    fn update_preparation(&self, preparation: &Preparation) -> RepoResult<()> {
        preparation.validate()?;
        let changed = self.conn.execute(
            "UPDATE batch_preparations
             SET name = ?1, portions = ?2, remaining_portions = ?3, storage = ?4,
                 prepared_on = ?5, expires_on = ?6
             WHERE uuid = ?7;",
            params![
                preparation.name.trim(),
                preparation.portions,
                preparation.remaining_portions,
                preparation.storage.as_str(),
                preparation.prepared_on,
                preparation.expires_on,
                preparation.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "preparation",
                id: preparation.id,
            });
        }
        Ok(())
    }

    fn get_preparation(&self, id: PreparationId) -> RepoResult<Option<Preparation>> {
        self.conn
            .query_row(
                &format!("{PREPARATION_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_preparation_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_preparations(&self, session_id: Option<SessionId>) -> RepoResult<Vec<Preparation>> {
        self.query_preparations(
            &format!(
                "{PREPARATION_SELECT_SQL}
                 WHERE (?1 IS NULL OR session_uuid = ?1)
                 ORDER BY expires_on ASC, name COLLATE NOCASE ASC;"
            ),
            [session_id.map(|id| id.to_string())],
        )
    }

    fn list_expiring_preparations(&self, until: NaiveDate) -> RepoResult<Vec<Preparation>> {
        self.query_preparations(
            &format!(
                "{PREPARATION_SELECT_SQL}
                 WHERE remaining_portions > 0 AND expires_on <= ?1
                 ORDER BY expires_on ASC, name COLLATE NOCASE ASC;"
            ),
            [until],
        )
    }
}

fn parse_session_row(row: &Row<'_>) -> RepoResult<BatchSession> {
    let uuid_text: String = row.get("uuid")?;
    let status_text: String = row.get("status")?;
    let recipe_ids_text: String = row.get("recipe_ids_json")?;
    let session = BatchSession {
        id: parse_uuid("batch_sessions.uuid", &uuid_text)?,
        name: row.get("name")?,
        planned_date: row.get("planned_date")?,
        status: parse_enum("batch_sessions.status", &status_text, SessionStatus::parse)?,
        recipe_ids: from_json("batch_sessions.recipe_ids_json", &recipe_ids_text)?,
        started_at: row.get("started_at")?,
        finished_at: row.get("finished_at")?,
        notes: row.get("notes")?,
    };
    session.validate()?;
    Ok(session)
}

fn parse_step_row(row: &Row<'_>) -> RepoResult<BatchStep> {
    let uuid_text: String = row.get("uuid")?;
    let session_text: String = row.get("session_uuid")?;
    let status_text: String = row.get("status")?;
    let step = BatchStep {
        id: parse_uuid("batch_steps.uuid", &uuid_text)?,
        session_id: parse_uuid("batch_steps.session_uuid", &session_text)?,
        position: row.get("position")?,
        title: row.get("title")?,
        recipe_id: parse_optional_uuid("batch_steps.recipe_uuid", row.get("recipe_uuid")?)?,
        duration_minutes: row.get("duration_minutes")?,
        parallel_group: row.get("parallel_group")?,
        status: parse_enum("batch_steps.status", &status_text, StepStatus::parse)?,
        started_at: row.get("started_at")?,
        finished_at: row.get("finished_at")?,
    };
    step.validate()?;
    Ok(step)
}

fn parse_preparation_row(row: &Row<'_>) -> RepoResult<Preparation> {
    let uuid_text: String = row.get("uuid")?;
    let session_text: String = row.get("session_uuid")?;
    let storage_text: String = row.get("storage")?;
    let preparation = Preparation {
        id: parse_uuid("batch_preparations.uuid", &uuid_text)?,
        session_id: parse_uuid("batch_preparations.session_uuid", &session_text)?,
        recipe_id: parse_optional_uuid(
            "batch_preparations.recipe_uuid",
            row.get("recipe_uuid")?,
        )?,
        name: row.get("name")?,
        portions: row.get("portions")?,
        remaining_portions: row.get("remaining_portions")?,
        storage: parse_enum("batch_preparations.storage", &storage_text, StorageKind::parse)?,
        prepared_on: row.get("prepared_on")?,
        expires_on: row.get("expires_on")?,
    };
    preparation.validate()?;
    Ok(preparation)
}
