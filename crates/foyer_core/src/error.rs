//! Application-level error hierarchy and user-message mapping.
//!
//! # Responsibility
//! - Collapse repository, validation and integration failures into one
//!   [`AppError`] that front-ends can render.
//! - Classify errors into user-facing severities.
//! - Provide the fallback-on-error helpers used at front-end boundaries.
//!
//! # Invariants
//! - `user_message()` never includes raw SQL or persisted user content.
//! - `handle_errors*` never panic and always log the swallowed error.

use crate::db::DbError;
use crate::model::batch::TransitionError;
use crate::repo::RepoError;
use crate::validation::ValidationError;
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AppResult<T> = Result<T, AppError>;

/// How a front-end should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable user mistake or expected condition.
    Warning,
    /// Unexpected failure of storage or an integration.
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    NotFound {
        entity: &'static str,
        id: String,
    },
    Database(RepoError),
    /// Planner/LLM integration failed or answered garbage.
    AiService(String),
    RateLimit {
        retry_after_secs: u64,
    },
    /// Lifecycle transition refused by the current status.
    InvalidState {
        entity: &'static str,
        from: &'static str,
        action: &'static str,
    },
    Import {
        line: usize,
        message: String,
    },
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Validation(_)
            | Self::NotFound { .. }
            | Self::RateLimit { .. }
            | Self::InvalidState { .. } => Severity::Warning,
            Self::Database(_) | Self::AiService(_) | Self::Import { .. } => Severity::Error,
        }
    }

    /// Short French message meant for end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => format!("Donnée invalide : {err}"),
            Self::NotFound { entity, .. } => format!("Élément introuvable ({entity})"),
            Self::Database(_) => "Erreur de base de données, réessayez plus tard".to_string(),
            Self::AiService(_) => "Le service IA est indisponible".to_string(),
            Self::RateLimit { retry_after_secs } => {
                format!("Trop de requêtes, réessayez dans {retry_after_secs} s")
            }
            Self::InvalidState { entity, from, action } => {
                format!("Action `{action}` impossible : {entity} est au statut `{from}`")
            }
            Self::Import { line, message } => format!("Import échoué ligne {line} : {message}"),
        }
    }

    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Database(_) => "database",
            Self::AiService(_) => "ai_service",
            Self::RateLimit { .. } => "rate_limit",
            Self::InvalidState { .. } => "invalid_state",
            Self::Import { .. } => "import",
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Database(err) => write!(f, "{err}"),
            Self::AiService(message) => write!(f, "ai service failure: {message}"),
            Self::RateLimit { retry_after_secs } => {
                write!(f, "rate limited, retry after {retry_after_secs}s")
            }
            Self::InvalidState { entity, from, action } => {
                write!(f, "cannot {action} {entity} in status `{from}`")
            }
            Self::Import { line, message } => write!(f, "import failed at line {line}: {message}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for AppError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, id } => Self::NotFound {
                entity,
                id: id.to_string(),
            },
            other => Self::Database(other),
        }
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Database(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Database(RepoError::from(value))
    }
}

impl From<TransitionError> for AppError {
    fn from(value: TransitionError) -> Self {
        Self::InvalidState {
            entity: value.entity,
            from: value.from,
            action: value.action,
        }
    }
}

/// Runs `op` and returns `fallback` when it fails.
///
/// The failure is logged with its severity; callers that need to show the
/// message should use [`AppError::user_message`] directly instead.
pub fn handle_errors<T>(context: &str, fallback: T, op: impl FnOnce() -> AppResult<T>) -> T {
    handle_errors_with(context, op, || fallback)
}

/// Lazy variant of [`handle_errors`].
pub fn handle_errors_with<T>(
    context: &str,
    op: impl FnOnce() -> AppResult<T>,
    fallback: impl FnOnce() -> T,
) -> T {
    match op() {
        Ok(value) => value,
        Err(err) => {
            log_swallowed(context, &err);
            fallback()
        }
    }
}

fn log_swallowed(context: &str, err: &AppError) {
    match err.severity() {
        Severity::Warning => warn!(
            "event={context} status=error severity=warning error_code={} fallback=true",
            err.code()
        ),
        Severity::Error => error!(
            "event={context} status=error severity=error error_code={} fallback=true error={}",
            err.code(),
            err
        ),
    }
}
