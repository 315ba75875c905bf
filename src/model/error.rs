//! Failure types reported by the persistence collaborator.
//!
//! Both failures are terminal for one attempt and recoverable by retry. They
//! never propagate past the coordinator: a [`SaveFailure`] becomes a
//! `save_error` mode and a [`DeleteFailure`] becomes a `delete_error` mode, with
//! the failure message (if any) copied into the post's `message` field.

use thiserror::Error;

/// A save (create or update) request did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("save failed{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct SaveFailure {
    /// Server or transport supplied detail, shown next to the retry button.
    pub message: Option<String>,
}

impl SaveFailure {
    /// Failure without any detail.
    pub fn new() -> Self {
        Self { message: None }
    }

    /// Failure carrying a displayable message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

impl Default for SaveFailure {
    fn default() -> Self {
        Self::new()
    }
}

/// A delete request did not succeed. The post stays intact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("delete failed{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct DeleteFailure {
    /// Server or transport supplied detail.
    pub message: Option<String>,
}

impl DeleteFailure {
    /// Failure without any detail.
    pub fn new() -> Self {
        Self { message: None }
    }

    /// Failure carrying a displayable message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

impl Default for DeleteFailure {
    fn default() -> Self {
        Self::new()
    }
}
