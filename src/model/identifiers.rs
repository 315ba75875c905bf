//! Identifier newtypes.
//!
//! Local ids are allocated by an [`IdSequence`] and are never reused for the
//! lifetime of the process. Remote ids come from the persistence layer and are
//! opaque to us apart from equality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-local identity of a comment or reply.
///
/// Unique among comments, or among the replies of one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(u64);

impl LocalId {
    /// Wrap a raw id. Prefer [`IdSequence::next_id`] for fresh entities.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned identity. Once a post has one it never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(u64);

impl RemoteId {
    /// Wrap a raw remote id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic allocator for [`LocalId`]s.
///
/// Starts at 1 so that 0 never shows up as an id.
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    /// Create a sequence whose first id is 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Create a sequence that continues after `last`.
    ///
    /// Used when seeding state that already contains ids.
    pub fn after(last: LocalId) -> Self {
        Self {
            next: last.get().saturating_add(1),
        }
    }

    /// Allocate the next id.
    pub fn next_id(&mut self) -> LocalId {
        let id = LocalId(self.next);
        self.next += 1;
        id
    }

    /// Make sure `id` is never handed out later.
    pub fn skip_past(&mut self, id: LocalId) {
        self.next = self.next.max(id.get().saturating_add(1));
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}
