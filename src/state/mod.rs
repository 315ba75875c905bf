//! Comment state machine (pure).
//!
//! All state transitions are pure functions testable without a host document.

pub mod comments;
pub mod lifecycle;

// Re-export for convenience
pub use comments::{reduce, Action, CommentFlags, CommentsState};
pub use lifecycle::{apply_intent, transition, Intent, InvalidTransition, PostKind, SaveReceipt};
