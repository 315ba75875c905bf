//! Comment collection state and its reducer.
//!
//! [`CommentsState`] is the root of all comment data. It only changes through
//! [`reduce`], a pure function from `(state, action)` to the next state, so
//! every mutation is an explicit, testable value.

use crate::model::{Comment, CommentUpdate, LocalId, Post, PostUpdate, Reply};
use indexmap::IndexMap;

// ===== CommentsState =====

/// Root comment state. Pure data, no side effects.
///
/// # Invariants
/// - `focused_comment` and `pinned_comment`, when set, name an existing,
///   non-deleted comment.
/// - `remote_comment_count` equals the number of persisted, non-deleted
///   comments, as long as the state is only changed through [`reduce`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentsState {
    /// Comments in insertion order, keyed by local id.
    pub comments: IndexMap<LocalId, Comment>,
    /// Comment that has keyboard/visual focus.
    pub focused_comment: Option<LocalId>,
    /// Comment whose position takes priority in layout.
    pub pinned_comment: Option<LocalId>,
    /// Number of comments that exist on the server.
    pub remote_comment_count: usize,
}

/// Flags derived from the collection for one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommentFlags {
    /// The comment is the focused one.
    pub is_focused: bool,
    /// The comment is the pinned one.
    pub is_pinned: bool,
}

impl CommentsState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a comment.
    pub fn comment(&self, id: LocalId) -> Option<&Comment> {
        self.comments.get(&id)
    }

    /// Look up a reply.
    pub fn reply(&self, comment_id: LocalId, reply_id: LocalId) -> Option<&Reply> {
        self.comment(comment_id)?.reply(reply_id)
    }

    /// Whether `id` is the focused comment.
    pub fn is_focused(&self, id: LocalId) -> bool {
        self.focused_comment == Some(id)
    }

    /// Whether `id` is the pinned comment.
    pub fn is_pinned(&self, id: LocalId) -> bool {
        self.pinned_comment == Some(id)
    }

    /// Derived focus/pin flags for `id`.
    pub fn flags(&self, id: LocalId) -> CommentFlags {
        CommentFlags {
            is_focused: self.is_focused(id),
            is_pinned: self.is_pinned(id),
        }
    }

    /// Comments that should be rendered, with their derived flags.
    pub fn visible_comments(&self) -> impl Iterator<Item = (&Comment, CommentFlags)> {
        self.comments
            .values()
            .filter(|comment| !comment.post.deleted)
            .map(|comment| (comment, self.flags(comment.local_id())))
    }

    /// Number of non-deleted comments, saved or not.
    pub fn comment_count(&self) -> usize {
        self.comments.values().filter(|c| !c.post.deleted).count()
    }

    /// Number of non-deleted comments that are not saved yet.
    pub fn local_only_comment_count(&self) -> usize {
        self.comments
            .values()
            .filter(|c| !c.post.deleted && !c.post.is_persisted())
            .count()
    }

    /// Whether `id` can be focused or pinned: it exists and is not deleted.
    pub fn selectable(&self, id: LocalId) -> bool {
        self.comment(id).is_some_and(|c| !c.post.deleted)
    }

    fn release_selection(&mut self, id: LocalId) {
        if self.focused_comment == Some(id) {
            self.focused_comment = None;
        }
        if self.pinned_comment == Some(id) {
            self.pinned_comment = None;
        }
    }
}

// ===== Action =====

/// A change to the comment collection.
///
/// Updates carry only the fields that change.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Insert a comment. An existing comment with the same id is replaced.
    AddComment(Comment),
    /// Patch a comment.
    UpdateComment(LocalId, CommentUpdate),
    /// Remove a comment and all its replies.
    DeleteComment(LocalId),
    /// Focus a comment, or clear focus.
    SetFocusedComment(Option<LocalId>),
    /// Pin a comment, or clear the pin.
    SetPinnedComment(Option<LocalId>),
    /// Append a reply to a comment.
    AddReply(LocalId, Reply),
    /// Patch a reply.
    UpdateReply(LocalId, LocalId, PostUpdate),
    /// Remove a reply.
    DeleteReply(LocalId, LocalId),
}

/// A post counts toward the remote totals while it is saved and not deleted.
fn counts_remotely(post: &Post) -> bool {
    post.is_persisted() && !post.deleted
}

fn adjust(count: usize, before: bool, after: bool) -> usize {
    match (before, after) {
        (false, true) => count + 1,
        (true, false) => count.saturating_sub(1),
        _ => count,
    }
}

/// Apply an action to the state.
///
/// Actions addressing unknown ids are ignored (logged at debug level); the
/// caller may hold a stale id after a concurrent delete.
pub fn reduce(mut state: CommentsState, action: Action) -> CommentsState {
    match action {
        Action::AddComment(comment) => {
            let id = comment.local_id();
            let before = state.comment(id).is_some_and(|c| counts_remotely(&c.post));
            let after = counts_remotely(&comment.post);
            state.remote_comment_count = adjust(state.remote_comment_count, before, after);
            state.comments.insert(id, comment);
        }
        Action::UpdateComment(id, update) => {
            let Some(comment) = state.comments.get_mut(&id) else {
                tracing::debug!(comment = %id, "update for unknown comment ignored");
                return state;
            };
            let before = counts_remotely(&comment.post);
            comment.apply(update);
            let after = counts_remotely(&comment.post);
            let deleted = comment.post.deleted;
            state.remote_comment_count = adjust(state.remote_comment_count, before, after);
            if deleted {
                state.release_selection(id);
            }
        }
        Action::DeleteComment(id) => {
            if let Some(comment) = state.comments.shift_remove(&id) {
                if counts_remotely(&comment.post) {
                    state.remote_comment_count = state.remote_comment_count.saturating_sub(1);
                }
            }
            state.release_selection(id);
        }
        Action::SetFocusedComment(target) => match target {
            Some(id) if !state.selectable(id) => {
                tracing::debug!(comment = %id, "cannot focus missing or deleted comment");
            }
            _ => state.focused_comment = target,
        },
        Action::SetPinnedComment(target) => match target {
            Some(id) if !state.selectable(id) => {
                tracing::debug!(comment = %id, "cannot pin missing or deleted comment");
            }
            _ => state.pinned_comment = target,
        },
        Action::AddReply(comment_id, reply) => {
            let Some(comment) = state.comments.get_mut(&comment_id) else {
                tracing::debug!(comment = %comment_id, "reply for unknown comment ignored");
                return state;
            };
            if counts_remotely(&reply) {
                comment.remote_reply_count += 1;
            }
            comment.replies.insert(reply.local_id, reply);
        }
        Action::UpdateReply(comment_id, reply_id, update) => {
            let Some(comment) = state.comments.get_mut(&comment_id) else {
                tracing::debug!(comment = %comment_id, "reply update for unknown comment ignored");
                return state;
            };
            let Some(reply) = comment.replies.get_mut(&reply_id) else {
                tracing::debug!(comment = %comment_id, reply = %reply_id, "update for unknown reply ignored");
                return state;
            };
            let before = counts_remotely(reply);
            reply.apply(update);
            let after = counts_remotely(reply);
            comment.remote_reply_count = adjust(comment.remote_reply_count, before, after);
        }
        Action::DeleteReply(comment_id, reply_id) => {
            if let Some(comment) = state.comments.get_mut(&comment_id) {
                if let Some(reply) = comment.replies.shift_remove(&reply_id) {
                    if counts_remotely(&reply) {
                        comment.remote_reply_count = comment.remote_reply_count.saturating_sub(1);
                    }
                }
            }
        }
    }

    state
}

// ===== Tests =====

#[cfg(test)]
#[path = "comments_tests.rs"]
mod tests;
