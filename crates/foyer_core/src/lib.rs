//! Core domain logic for Foyer, the household manager.
//! This crate is the single source of truth for business invariants.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validation;

pub use cache::TtlCache;
pub use config::{load_config, AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use error::{handle_errors, handle_errors_with, AppError, AppResult, Severity};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use repo::{Page, RepoError, RepoResult};
pub use validation::{ValidationError, ValidationErrorKind};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
