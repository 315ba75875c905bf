//! Post lifecycle state machine.
//!
//! A single pure function, [`transition`], maps the current post and an
//! [`Intent`] to the patch that moves it into its next mode:
//!
//! ```text
//! creating ──save──▶ saving ──ok──▶ default ◀──cancel── editing
//!                      │  ▲                 │  ──edit──▶
//!                     err retry             ├──delete──▶ delete_confirm ──confirm──▶ deleting
//!                      ▼  │                 └──resolve─────────────────────────────▶ deleting
//!                   save_error                                   delete_error ◀──err──┘
//! ```
//!
//! Replies skip `delete_confirm` and cannot be resolved. Failures from the
//! persistence collaborator arrive as [`Intent::SaveFailed`] and
//! [`Intent::DeleteFailed`] and are turned into `*_error` modes; nothing is
//! thrown. An intent that makes no sense in the current mode yields
//! [`InvalidTransition`] and no patch.

use crate::model::{Author, DeleteFailure, Mode, Post, PostUpdate, RemoteId, SaveFailure};
use chrono::{DateTime, Utc};
use std::rc::Rc;
use thiserror::Error;

/// Which kind of post a transition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    /// Top-level comment.
    Comment,
    /// Reply inside a comment.
    Reply,
}

/// Authoritative fields returned by a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReceipt {
    /// Server id of the saved post.
    pub remote_id: RemoteId,
    /// Author as recorded by the server.
    pub author: Rc<Author>,
    /// Date as recorded by the server.
    pub date: DateTime<Utc>,
    /// Optional status text to show with the post.
    pub message: Option<String>,
}

/// A user action or an operation completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Enter `editing`, capturing the committed text for cancel.
    StartEdit,
    /// Replace the edit buffer.
    EditText(String),
    /// Leave `editing`, restoring the captured text.
    CancelEdit,
    /// Discard a comment that is still being created.
    CancelCreate,
    /// Commit the buffer (if editing or creating) and start saving.
    Save,
    /// The save request succeeded.
    SaveSucceeded(SaveReceipt),
    /// The save request failed.
    SaveFailed(SaveFailure),
    /// Ask to delete; comments go to `delete_confirm`, replies straight to `deleting`.
    RequestDelete,
    /// Confirm a pending delete (also retries from `delete_error`).
    ConfirmDelete,
    /// Back out of `delete_confirm` or `delete_error`.
    CancelDelete,
    /// Resolve a comment: delete it without confirmation.
    Resolve,
    /// The delete request succeeded.
    DeleteSucceeded,
    /// The delete request failed.
    DeleteFailed(DeleteFailure),
    /// Retry the failed operation.
    Retry,
}

impl Intent {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::StartEdit => "start_edit",
            Intent::EditText(_) => "edit_text",
            Intent::CancelEdit => "cancel_edit",
            Intent::CancelCreate => "cancel_create",
            Intent::Save => "save",
            Intent::SaveSucceeded(_) => "save_succeeded",
            Intent::SaveFailed(_) => "save_failed",
            Intent::RequestDelete => "request_delete",
            Intent::ConfirmDelete => "confirm_delete",
            Intent::CancelDelete => "cancel_delete",
            Intent::Resolve => "resolve",
            Intent::DeleteSucceeded => "delete_succeeded",
            Intent::DeleteFailed(_) => "delete_failed",
            Intent::Retry => "retry",
        }
    }
}

/// The intent is not valid in the post's current mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply '{intent}' to a {kind:?} in mode '{from}'")]
pub struct InvalidTransition {
    /// Kind of post.
    pub kind: PostKind,
    /// Mode the post was in.
    pub from: &'static str,
    /// Intent that was rejected.
    pub intent: &'static str,
}

/// Compute the patch that applies `intent` to `post`.
///
/// # Errors
///
/// Returns [`InvalidTransition`] if the intent is not allowed in the current
/// mode, or if the post is already a tombstone.
pub fn transition(
    post: &Post,
    kind: PostKind,
    intent: Intent,
) -> Result<PostUpdate, InvalidTransition> {
    let reject = |intent: &Intent| InvalidTransition {
        kind,
        from: post.mode.as_str(),
        intent: intent.name(),
    };

    if post.deleted {
        return Err(reject(&intent));
    }

    let update = match (&post.mode, intent) {
        // Buffer edits
        (Mode::Creating | Mode::Editing { .. }, Intent::EditText(text)) => PostUpdate {
            new_text: Some(text),
            ..PostUpdate::default()
        },

        // Editing
        (Mode::Default, Intent::StartEdit) => PostUpdate {
            mode: Some(Mode::Editing {
                previous_text: post.text.clone(),
            }),
            new_text: Some(post.text.clone()),
            ..PostUpdate::default()
        },
        (Mode::Editing { previous_text }, Intent::CancelEdit) => PostUpdate {
            mode: Some(Mode::Default),
            text: Some(previous_text.clone()),
            new_text: Some(String::new()),
            ..PostUpdate::default()
        },
        (Mode::Creating, Intent::CancelCreate) => PostUpdate {
            deleted: Some(true),
            ..PostUpdate::default()
        },

        // Saving: the buffer becomes the committed text before the request starts
        (Mode::Creating | Mode::Editing { .. }, Intent::Save) => PostUpdate {
            mode: Some(Mode::Saving),
            text: Some(post.new_text.clone()),
            new_text: Some(String::new()),
            message: Some(String::new()),
            ..PostUpdate::default()
        },
        (Mode::Default | Mode::SaveError, Intent::Save)
        | (Mode::SaveError, Intent::Retry) => PostUpdate {
            mode: Some(Mode::Saving),
            message: Some(String::new()),
            ..PostUpdate::default()
        },
        (Mode::Saving, Intent::SaveSucceeded(receipt)) => PostUpdate {
            mode: Some(Mode::Default),
            remote_id: Some(receipt.remote_id),
            author: Some(receipt.author),
            date: Some(receipt.date),
            message: Some(receipt.message.unwrap_or_default()),
            ..PostUpdate::default()
        },
        (Mode::Saving, Intent::SaveFailed(failure)) => PostUpdate {
            mode: Some(Mode::SaveError),
            message: Some(failure.message.unwrap_or_default()),
            ..PostUpdate::default()
        },

        // Deleting
        (Mode::Default, Intent::RequestDelete) => match kind {
            PostKind::Comment => PostUpdate::mode(Mode::DeleteConfirm),
            PostKind::Reply => deleting(),
        },
        (Mode::Default, Intent::Resolve) if kind == PostKind::Comment => deleting(),
        (Mode::DeleteConfirm, Intent::ConfirmDelete)
        | (Mode::DeleteError, Intent::ConfirmDelete | Intent::Retry) => deleting(),
        (Mode::DeleteConfirm | Mode::DeleteError, Intent::CancelDelete) => PostUpdate {
            mode: Some(Mode::Default),
            message: Some(String::new()),
            ..PostUpdate::default()
        },
        (Mode::Deleting, Intent::DeleteSucceeded) => PostUpdate {
            deleted: Some(true),
            ..PostUpdate::default()
        },
        (Mode::Deleting, Intent::DeleteFailed(failure)) => PostUpdate {
            mode: Some(Mode::DeleteError),
            message: Some(failure.message.unwrap_or_default()),
            ..PostUpdate::default()
        },

        (_, intent) => return Err(reject(&intent)),
    };

    tracing::trace!(
        local_id = %post.local_id,
        from = post.mode.as_str(),
        to = update.mode.as_ref().map(Mode::as_str).unwrap_or(post.mode.as_str()),
        "post transition"
    );

    Ok(update)
}

fn deleting() -> PostUpdate {
    PostUpdate {
        mode: Some(Mode::Deleting),
        message: Some(String::new()),
        ..PostUpdate::default()
    }
}

/// Apply `intent` to `post` in place.
///
/// Convenience over [`transition`] + [`Post::apply`]; the post is left
/// untouched on error.
///
/// # Errors
///
/// See [`transition`].
pub fn apply_intent(post: &mut Post, kind: PostKind, intent: Intent) -> Result<(), InvalidTransition> {
    let update = transition(post, kind, intent)?;
    post.apply(update);
    Ok(())
}

// ===== Tests =====

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
