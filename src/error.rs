//! Top-level error for the command line tool.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::scenario::ScenarioError;
use thiserror::Error;

/// Anything that stops the CLI from producing a layout.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging could not be set up.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// The scenario could not be read or serialized.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}
