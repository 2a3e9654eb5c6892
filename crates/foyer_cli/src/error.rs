//! CLI error type and exit-code mapping.

use foyer_core::config::ConfigError;
use foyer_core::logging::LoggingError;
use foyer_core::{AppError, Severity};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub enum CliError {
    App(AppError),
    Config(ConfigError),
    Logging(LoggingError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CliError {
    /// `1` for errors, `2` for warnings.
    pub fn exit_code(&self) -> u8 {
        match self.severity() {
            Severity::Error => 1,
            Severity::Warning => 2,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::App(err) => err.severity(),
            Self::Config(_) | Self::Logging(_) | Self::Io { .. } => Severity::Error,
        }
    }

    /// Message shown to the user on stderr.
    pub fn user_message(&self) -> String {
        match self {
            Self::App(err) => err.user_message(),
            Self::Config(err) => format!("Configuration invalide : {err}"),
            Self::Logging(err) => format!("Journalisation indisponible : {err}"),
            Self::Io { path, .. } => format!("Fichier illisible : {}", path.display()),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::App(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::App(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<AppError> for CliError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<foyer_core::DbError> for CliError {
    fn from(value: foyer_core::DbError) -> Self {
        Self::App(value.into())
    }
}

impl From<foyer_core::RepoError> for CliError {
    fn from(value: foyer_core::RepoError) -> Self {
        Self::App(value.into())
    }
}
