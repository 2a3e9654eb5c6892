//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per vertical.
//! - Isolate SQLite query details from service/business orchestration.
//! - Share the generic list/stat plumbing (`Page`, `CountBy`) and row
//!   decoding helpers.
//!
//! # Invariants
//! - Repository writes must call the model `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::validation::ValidationError;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod batch_repo;
pub mod famille_repo;
pub mod finance_repo;
pub mod garden_repo;
pub mod inventory_repo;
pub mod jeux_repo;
pub mod recipe_repo;
pub mod shopping_repo;

const PAGE_DEFAULT_LIMIT: u32 = 50;
pub(crate) const PAGE_LIMIT_MAX: u32 = 500;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error shared by every vertical.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: Uuid },
    InvalidData(String),
    /// Connection was not migrated to a schema containing this table.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Pagination window shared by list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Maximum rows to return. Defaults to 50 and clamps to 500.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Appends `LIMIT/OFFSET` clauses and their bind values.
    pub(crate) fn push_sql(&self, sql: &mut String, bind_values: &mut Vec<rusqlite::types::Value>) {
        sql.push_str(" LIMIT ?");
        bind_values.push(rusqlite::types::Value::Integer(i64::from(
            normalize_limit(self.limit),
        )));
        if self.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(rusqlite::types::Value::Integer(i64::from(self.offset)));
        }
    }
}

/// Normalizes list limit according to the pagination contract.
pub fn normalize_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => PAGE_DEFAULT_LIMIT,
        Some(value) if value > PAGE_LIMIT_MAX => PAGE_LIMIT_MAX,
        Some(value) => value,
    }
}

/// One row of a generic `GROUP BY` statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountBy {
    pub key: String,
    pub count: u64,
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(table_column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {table_column}"
        ))),
    }
}

pub(crate) fn parse_uuid(table_column: &str, value: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{value}` in {table_column}"))
    })
}

pub(crate) fn parse_optional_uuid(
    table_column: &str,
    value: Option<String>,
) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(table_column, &text)).transpose()
}

/// Parses a status-like text column with a model parser.
pub(crate) fn parse_enum<T>(
    table_column: &str,
    value: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> RepoResult<T> {
    parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid value `{value}` in {table_column}"))
    })
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode json column: {err}")))
}

pub(crate) fn from_json<T: DeserializeOwned>(table_column: &str, text: &str) -> RepoResult<T> {
    serde_json::from_str(text)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {table_column}: {err}")))
}

/// Rejects connections that were not migrated far enough for a repository.
pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{int_to_bool, normalize_limit, parse_uuid, Page};

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 50);
        assert_eq!(normalize_limit(Some(10)), 10);
        assert_eq!(normalize_limit(Some(10_000)), 500);
    }

    #[test]
    fn page_sql_skips_zero_offset() {
        let mut sql = String::from("SELECT 1");
        let mut binds = Vec::new();
        Page::new(5, 0).push_sql(&mut sql, &mut binds);
        assert_eq!(sql, "SELECT 1 LIMIT ?");
        assert_eq!(binds.len(), 1);

        let mut sql = String::from("SELECT 1");
        let mut binds = Vec::new();
        Page::new(5, 10).push_sql(&mut sql, &mut binds);
        assert!(sql.ends_with("OFFSET ?"));
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn decoding_helpers_reject_garbage() {
        assert!(int_to_bool("t.c", 2).is_err());
        assert!(parse_uuid("t.c", "not-a-uuid").is_err());
    }
}
