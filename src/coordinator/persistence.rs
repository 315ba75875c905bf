//! Boundary to whatever stores comments remotely.

use crate::model::{Comment, DeleteFailure, LocalId, Reply, SaveFailure};
use crate::state::{PostKind, SaveReceipt};

/// Stores and deletes comments and replies.
///
/// Calls may block or be driven by an event loop; the coordinator only cares
/// about the success/failure shape. Every failure is recoverable by retry.
pub trait Persistence {
    /// Create or update a comment.
    fn save_comment(&mut self, comment: &Comment) -> Result<SaveReceipt, SaveFailure>;

    /// Delete (or resolve) a comment.
    fn delete_comment(&mut self, comment: &Comment) -> Result<(), DeleteFailure>;

    /// Create or update a reply on a saved comment.
    fn save_reply(&mut self, comment: &Comment, reply: &Reply) -> Result<SaveReceipt, SaveFailure>;

    /// Delete a reply.
    fn delete_reply(&mut self, comment: &Comment, reply: &Reply) -> Result<(), DeleteFailure>;
}

/// The post an operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A top-level comment.
    Comment(LocalId),
    /// A reply inside a comment.
    Reply {
        /// Owning comment.
        comment: LocalId,
        /// The reply.
        reply: LocalId,
    },
}

impl Target {
    /// Post kind for the lifecycle transition.
    pub fn kind(&self) -> PostKind {
        match self {
            Target::Comment(_) => PostKind::Comment,
            Target::Reply { .. } => PostKind::Reply,
        }
    }
}

/// What an operation does remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create or update.
    Save,
    /// Delete.
    Delete,
}

/// Ticket for an operation that has started and awaits completion.
///
/// Stamped with the post's operation generation; completing a ticket whose
/// generation is no longer current has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOp {
    /// Post the operation acts on.
    pub target: Target,
    /// Save or delete.
    pub operation: Operation,
    /// Generation of the post when the operation started.
    pub generation: u64,
}

/// Whether a completion changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The outcome was applied to the post.
    Applied,
    /// The post moved on (newer operation, or gone); the outcome was dropped.
    Stale,
}
