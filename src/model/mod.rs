//! Domain model types (pure).
//!
//! All types in this module are plain data; behavior lives in `state`.

pub mod error;
pub mod identifiers;
pub mod post;

// Re-export for convenience
pub use error::{DeleteFailure, SaveFailure};
pub use identifiers::{IdSequence, LocalId, RemoteId};
pub use post::{Author, Comment, CommentUpdate, Mode, Post, PostUpdate, Reply};
