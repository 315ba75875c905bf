//! Coordinator - glues comment state, lifecycle and layout together.
//!
//! # Module Structure
//!
//! - `persistence`: Persistence trait, operation tickets and completion results
//!
//! The coordinator is the impure shell around the pure pieces: it owns the
//! [`CommentsState`] and feeds it through [`reduce`], runs lifecycle
//! transitions, allocates ids, and keeps the [`LayoutController`] and the
//! host annotations in sync with the collection.
//!
//! Saves and deletes are two-phase. Starting one (e.g. [`Intent::Save`])
//! returns a [`PendingOp`]; its outcome is fed back through
//! [`Coordinator::complete_save`] / [`Coordinator::complete_delete`], or the
//! whole round trip is run against a [`Persistence`] backend with
//! [`Coordinator::perform`].

pub mod persistence;

pub use persistence::{Completion, Operation, PendingOp, Persistence, Target};

use crate::layout::{Annotation, LayoutController, LayoutParams};
use crate::model::{
    Author, Comment, CommentUpdate, DeleteFailure, IdSequence, LocalId, Mode, Post, PostUpdate,
    SaveFailure,
};
use crate::state::{
    reduce, transition, Action, CommentsState, Intent, InvalidTransition, PostKind, SaveReceipt,
};
use chrono::Utc;
use std::rc::Rc;
use thiserror::Error;

/// Errors from coordinator operations.
///
/// None of these change any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// No comment with this id.
    #[error("unknown comment {0}")]
    UnknownComment(LocalId),

    /// No reply with this id in the comment.
    #[error("unknown reply {reply} in comment {comment}")]
    UnknownReply {
        /// Comment that was searched.
        comment: LocalId,
        /// Reply that was not found.
        reply: LocalId,
    },

    /// The lifecycle rejected the intent.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    /// Replies can only be added to saved comments.
    #[error("comment {0} is not saved yet")]
    NotPersisted(LocalId),

    /// The current user does not own the post.
    #[error("post {0} belongs to another user")]
    NotAuthor(LocalId),

    /// The reply composer is empty.
    #[error("reply to comment {0} is empty")]
    EmptyReply(LocalId),

    /// Operation outcomes must be delivered with their ticket.
    #[error("'{0}' is an operation outcome; complete the pending operation instead")]
    OutcomeWithoutTicket(&'static str),
}

/// Owns the comment collection and everything derived from it.
#[derive(Debug)]
pub struct Coordinator {
    state: CommentsState,
    layout: LayoutController,
    user: Option<Rc<Author>>,
    comment_ids: IdSequence,
    reply_ids: IdSequence,
}

impl Coordinator {
    /// Empty coordinator acting on behalf of `user`.
    pub fn new(user: Option<Author>, params: LayoutParams) -> Self {
        Self::with_state(CommentsState::new(), user, params)
    }

    /// Coordinator over an existing collection (e.g. loaded from the server).
    ///
    /// Id sequences continue after the largest ids present. A focus or pin on
    /// a missing or deleted comment is dropped.
    pub fn with_state(state: CommentsState, user: Option<Author>, params: LayoutParams) -> Self {
        let none = LocalId::new(0);
        let last_comment = state.comments.keys().copied().max().unwrap_or(none);
        let last_reply = state
            .comments
            .values()
            .flat_map(|comment| comment.replies.keys().copied())
            .max()
            .unwrap_or(none);

        let mut state = state;
        if let Some(id) = state.focused_comment.filter(|id| !state.selectable(*id)) {
            tracing::debug!(comment = %id, "dropping focus on missing or deleted comment");
            state.focused_comment = None;
        }
        if let Some(id) = state.pinned_comment.filter(|id| !state.selectable(*id)) {
            tracing::debug!(comment = %id, "dropping pin on missing or deleted comment");
            state.pinned_comment = None;
        }

        let mut layout = LayoutController::new(params);
        layout.set_pinned(state.pinned_comment);

        Self {
            state,
            layout,
            user: user.map(Rc::new),
            comment_ids: IdSequence::after(last_comment),
            reply_ids: IdSequence::after(last_reply),
        }
    }

    /// Current comment state.
    pub fn state(&self) -> &CommentsState {
        &self.state
    }

    /// Layout controller.
    pub fn layout(&self) -> &LayoutController {
        &self.layout
    }

    /// User new posts are attributed to.
    pub fn user(&self) -> Option<&Rc<Author>> {
        self.user.as_ref()
    }

    /// Look up a comment.
    pub fn comment(&self, id: LocalId) -> Option<&Comment> {
        self.state.comment(id)
    }

    /// Number of comments known to exist on the server.
    pub fn remote_comment_count(&self) -> usize {
        self.state.remote_comment_count
    }

    /// Number of comments shown, saved or not.
    pub fn comment_count(&self) -> usize {
        self.state.comment_count()
    }

    fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    // ===== Creation =====

    /// Start a new comment on `annotation`, focused and in `creating` mode.
    pub fn create_comment(
        &mut self,
        contentpath: impl Into<String>,
        annotation: &Rc<dyn Annotation>,
    ) -> LocalId {
        let id = self.comment_ids.next_id();
        let post = Post::draft(id, self.user.clone(), Utc::now());
        self.dispatch(Action::AddComment(Comment::new(post, contentpath)));
        self.layout.set_annotation(id, annotation);
        self.dispatch(Action::SetFocusedComment(Some(id)));
        tracing::debug!(comment = %id, "comment created");
        id
    }

    /// Add an existing comment, optionally attached to its anchor.
    ///
    /// The comment keeps its id; the id sequences skip past it.
    pub fn add_comment(&mut self, comment: Comment, annotation: Option<&Rc<dyn Annotation>>) {
        let id = comment.local_id();
        self.comment_ids.skip_past(id);
        for reply_id in comment.replies.keys() {
            self.reply_ids.skip_past(*reply_id);
        }
        self.dispatch(Action::AddComment(comment));
        if let Some(annotation) = annotation {
            self.layout.set_annotation(id, annotation);
        }
    }

    // ===== Intents =====

    fn check_intent(&self, post: &Post, intent: &Intent) -> Result<(), CoordinatorError> {
        match intent {
            Intent::SaveSucceeded(_)
            | Intent::SaveFailed(_)
            | Intent::DeleteSucceeded
            | Intent::DeleteFailed(_) => Err(CoordinatorError::OutcomeWithoutTicket(intent.name())),
            Intent::StartEdit | Intent::RequestDelete
                if !post.is_owned_by(self.user.as_deref()) =>
            {
                Err(CoordinatorError::NotAuthor(post.local_id))
            }
            _ => Ok(()),
        }
    }

    /// Apply a user intent to a comment.
    ///
    /// Returns a ticket when the intent started a save or delete.
    ///
    /// # Errors
    ///
    /// Unknown comment, rejected transition, ownership violation, or an
    /// outcome intent delivered without its ticket.
    pub fn comment_intent(
        &mut self,
        id: LocalId,
        intent: Intent,
    ) -> Result<Option<PendingOp>, CoordinatorError> {
        let comment = self
            .state
            .comment(id)
            .ok_or(CoordinatorError::UnknownComment(id))?;
        self.check_intent(&comment.post, &intent)?;
        let update = transition(&comment.post, PostKind::Comment, intent)?;

        let started = started_operation(&update);
        let removed = update.deleted == Some(true);
        self.dispatch(Action::UpdateComment(id, update.into()));

        if removed {
            // Only cancelling a draft tombstones a comment without a request.
            self.remove_comment(id);
            return Ok(None);
        }
        Ok(started.map(|operation| self.begin(Target::Comment(id), operation)))
    }

    /// Apply a user intent to a reply.
    ///
    /// # Errors
    ///
    /// See [`comment_intent`](Self::comment_intent).
    pub fn reply_intent(
        &mut self,
        comment_id: LocalId,
        reply_id: LocalId,
        intent: Intent,
    ) -> Result<Option<PendingOp>, CoordinatorError> {
        let reply = self.reply(comment_id, reply_id)?;
        self.check_intent(reply, &intent)?;
        let update = transition(reply, PostKind::Reply, intent)?;

        let started = started_operation(&update);
        self.dispatch(Action::UpdateReply(comment_id, reply_id, update));

        Ok(started.map(|operation| {
            self.begin(
                Target::Reply {
                    comment: comment_id,
                    reply: reply_id,
                },
                operation,
            )
        }))
    }

    fn reply(&self, comment_id: LocalId, reply_id: LocalId) -> Result<&Post, CoordinatorError> {
        let comment = self
            .state
            .comment(comment_id)
            .ok_or(CoordinatorError::UnknownComment(comment_id))?;
        comment.reply(reply_id).ok_or(CoordinatorError::UnknownReply {
            comment: comment_id,
            reply: reply_id,
        })
    }

    // ===== Reply composer =====

    /// Replace the reply composer buffer.
    ///
    /// # Errors
    ///
    /// Unknown comment.
    pub fn set_new_reply(
        &mut self,
        comment_id: LocalId,
        text: impl Into<String>,
    ) -> Result<(), CoordinatorError> {
        self.update_new_reply(comment_id, text.into())
    }

    /// Clear the reply composer buffer.
    ///
    /// # Errors
    ///
    /// Unknown comment.
    pub fn cancel_new_reply(&mut self, comment_id: LocalId) -> Result<(), CoordinatorError> {
        self.update_new_reply(comment_id, String::new())
    }

    fn update_new_reply(&mut self, comment_id: LocalId, text: String) -> Result<(), CoordinatorError> {
        if self.state.comment(comment_id).is_none() {
            return Err(CoordinatorError::UnknownComment(comment_id));
        }
        self.dispatch(Action::UpdateComment(
            comment_id,
            CommentUpdate {
                new_reply: Some(text),
                ..CommentUpdate::default()
            },
        ));
        Ok(())
    }

    /// Turn the composer buffer into a reply and start saving it.
    ///
    /// The reply is shown immediately in `saving` mode and the buffer is
    /// cleared.
    ///
    /// # Errors
    ///
    /// Unknown or unsaved comment, or an empty buffer.
    pub fn submit_new_reply(&mut self, comment_id: LocalId) -> Result<PendingOp, CoordinatorError> {
        let comment = self
            .state
            .comment(comment_id)
            .ok_or(CoordinatorError::UnknownComment(comment_id))?;
        if comment.post.deleted || !comment.post.is_persisted() {
            return Err(CoordinatorError::NotPersisted(comment_id));
        }
        if comment.new_reply.trim().is_empty() {
            return Err(CoordinatorError::EmptyReply(comment_id));
        }
        let text = comment.new_reply.clone();

        let reply_id = self.reply_ids.next_id();
        let reply = Post::pending(reply_id, self.user.clone(), Utc::now(), text);
        self.dispatch(Action::AddReply(comment_id, reply));
        self.dispatch(Action::UpdateComment(
            comment_id,
            CommentUpdate {
                new_reply: Some(String::new()),
                ..CommentUpdate::default()
            },
        ));

        Ok(self.begin(
            Target::Reply {
                comment: comment_id,
                reply: reply_id,
            },
            Operation::Save,
        ))
    }

    // ===== Operations =====

    fn post_mut(&mut self, target: Target) -> Option<&mut Post> {
        match target {
            Target::Comment(id) => self.state.comments.get_mut(&id).map(|c| &mut c.post),
            Target::Reply { comment, reply } => self
                .state
                .comments
                .get_mut(&comment)
                .and_then(|c| c.replies.get_mut(&reply)),
        }
    }

    fn post(&self, target: Target) -> Option<&Post> {
        match target {
            Target::Comment(id) => self.state.comment(id).map(|c| &c.post),
            Target::Reply { comment, reply } => self.state.reply(comment, reply),
        }
    }

    fn begin(&mut self, target: Target, operation: Operation) -> PendingOp {
        let generation = self
            .post_mut(target)
            .map(Post::bump_generation)
            .unwrap_or_default();
        tracing::debug!(post = ?target, ?operation, generation, "operation started");
        PendingOp {
            target,
            operation,
            generation,
        }
    }

    /// Deliver the outcome of a save.
    ///
    /// On success the post takes the server's id, author and date; on failure
    /// it moves to `save_error` with the failure message.
    ///
    /// # Errors
    ///
    /// The post is not in `saving` even though the ticket is current.
    pub fn complete_save(
        &mut self,
        op: &PendingOp,
        result: Result<SaveReceipt, SaveFailure>,
    ) -> Result<Completion, CoordinatorError> {
        let intent = match result {
            Ok(receipt) => Intent::SaveSucceeded(receipt),
            Err(failure) => Intent::SaveFailed(failure),
        };
        self.complete(op, intent)
    }

    /// Deliver the outcome of a delete.
    ///
    /// A deleted comment is removed from the collection and its annotation is
    /// told to go away; a deleted reply stays behind as a hidden tombstone.
    ///
    /// # Errors
    ///
    /// The post is not in `deleting` even though the ticket is current.
    pub fn complete_delete(
        &mut self,
        op: &PendingOp,
        result: Result<(), DeleteFailure>,
    ) -> Result<Completion, CoordinatorError> {
        let intent = match result {
            Ok(()) => Intent::DeleteSucceeded,
            Err(failure) => Intent::DeleteFailed(failure),
        };
        self.complete(op, intent)
    }

    fn complete(&mut self, op: &PendingOp, intent: Intent) -> Result<Completion, CoordinatorError> {
        let Some(post) = self.post(op.target) else {
            tracing::warn!(post = ?op.target, outcome = intent.name(), "completion for removed post dropped");
            return Ok(Completion::Stale);
        };
        if post.deleted || post.generation() != op.generation {
            tracing::warn!(
                post = ?op.target,
                outcome = intent.name(),
                ticket = op.generation,
                current = post.generation(),
                "stale completion dropped"
            );
            return Ok(Completion::Stale);
        }

        let update = transition(post, op.target.kind(), intent.clone())?;
        let removed = update.deleted == Some(true);

        match &intent {
            Intent::SaveFailed(failure) => {
                tracing::warn!(post = ?op.target, %failure, "save failed");
            }
            Intent::DeleteFailed(failure) => {
                tracing::warn!(post = ?op.target, %failure, "delete failed");
            }
            _ => tracing::info!(post = ?op.target, outcome = intent.name(), "operation confirmed"),
        }

        match op.target {
            Target::Comment(id) => {
                self.dispatch(Action::UpdateComment(id, update.into()));
                if removed {
                    self.remove_comment(id);
                }
            }
            Target::Reply { comment, reply } => {
                self.dispatch(Action::UpdateReply(comment, reply, update));
            }
        }
        Ok(Completion::Applied)
    }

    /// Run a pending operation against `backend` and apply its outcome.
    ///
    /// # Errors
    ///
    /// See [`complete_save`](Self::complete_save).
    pub fn perform<P: Persistence + ?Sized>(
        &mut self,
        op: &PendingOp,
        backend: &mut P,
    ) -> Result<Completion, CoordinatorError> {
        match (op.target, op.operation) {
            (Target::Comment(id), operation) => {
                let Some(comment) = self.state.comment(id) else {
                    return Ok(Completion::Stale);
                };
                match operation {
                    Operation::Save => {
                        let result = backend.save_comment(comment);
                        self.complete_save(op, result)
                    }
                    Operation::Delete => {
                        let result = backend.delete_comment(comment);
                        self.complete_delete(op, result)
                    }
                }
            }
            (Target::Reply { comment, reply }, operation) => {
                let Some(parent) = self.state.comment(comment) else {
                    return Ok(Completion::Stale);
                };
                let Some(post) = parent.reply(reply) else {
                    return Ok(Completion::Stale);
                };
                match operation {
                    Operation::Save => {
                        let result = backend.save_reply(parent, post);
                        self.complete_save(op, result)
                    }
                    Operation::Delete => {
                        let result = backend.delete_reply(parent, post);
                        self.complete_delete(op, result)
                    }
                }
            }
        }
    }

    /// Drop reply tombstones from a comment. Returns how many were removed.
    pub fn purge_deleted_replies(&mut self, comment_id: LocalId) -> usize {
        let Some(comment) = self.state.comment(comment_id) else {
            return 0;
        };
        let tombstones: Vec<LocalId> = comment
            .replies
            .values()
            .filter(|reply| reply.deleted)
            .map(|reply| reply.local_id)
            .collect();
        let purged = tombstones.len();
        for reply_id in tombstones {
            self.dispatch(Action::DeleteReply(comment_id, reply_id));
        }
        purged
    }

    fn remove_comment(&mut self, id: LocalId) {
        if let Some(annotation) = self.layout.annotation(id) {
            annotation.on_delete();
        }
        self.layout.remove_comment(id);
        self.dispatch(Action::DeleteComment(id));
        self.layout.set_pinned(self.state.pinned_comment);
        tracing::debug!(comment = %id, "comment removed");
    }

    // ===== Selection and layout =====

    /// Focus a comment, or clear focus. Missing or deleted comments are ignored.
    pub fn set_focused_comment(&mut self, id: Option<LocalId>) {
        self.dispatch(Action::SetFocusedComment(id));
    }

    /// Pin a comment, or clear the pin. The layout follows the resulting state.
    pub fn set_pinned_comment(&mut self, id: Option<LocalId>) {
        self.dispatch(Action::SetPinnedComment(id));
        self.layout.set_pinned(self.state.pinned_comment);
    }

    /// Attach the anchor of an existing comment.
    ///
    /// If the card is already on screen the anchor is shown straight away.
    pub fn set_annotation(
        &mut self,
        id: LocalId,
        annotation: &Rc<dyn Annotation>,
    ) -> Result<(), CoordinatorError> {
        if !self.state.selectable(id) {
            return Err(CoordinatorError::UnknownComment(id));
        }
        self.layout.set_annotation(id, annotation);
        if self.layout.is_registered(id) {
            annotation.show();
        }
        Ok(())
    }

    /// The card for `id` was rendered with `height`.
    ///
    /// Registers it with the layout and highlights its annotation.
    ///
    /// # Errors
    ///
    /// Unknown comment.
    pub fn mount_comment(&mut self, id: LocalId, height: f64) -> Result<(), CoordinatorError> {
        if !self.state.selectable(id) {
            return Err(CoordinatorError::UnknownComment(id));
        }
        self.layout.register_comment(id);
        self.layout.set_height(id, height);
        if let Some(annotation) = self.layout.annotation(id) {
            annotation.show();
        }
        Ok(())
    }

    /// The card for `id` left the screen.
    pub fn unmount_comment(&mut self, id: LocalId) {
        self.layout.unregister_comment(id);
        if let Some(annotation) = self.layout.annotation(id) {
            annotation.hide();
        }
    }

    /// The card for `id` was re-measured.
    pub fn report_height(&mut self, id: LocalId, height: f64) {
        self.layout.set_height(id, height);
    }

    /// Recompute card positions if anything changed.
    pub fn refresh_layout(&mut self) -> bool {
        self.layout.refresh()
    }

    /// Where the card for `id` should be drawn.
    pub fn comment_position(&self, id: LocalId) -> Option<f64> {
        self.layout.position(id)
    }
}

/// Which remote operation a patch starts, if any.
fn started_operation(update: &PostUpdate) -> Option<Operation> {
    match update.mode {
        Some(Mode::Saving) => Some(Operation::Save),
        Some(Mode::Deleting) => Some(Operation::Delete),
        _ => None,
    }
}

// ===== Tests =====

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
