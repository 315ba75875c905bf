//! Comment, reply and author records.
//!
//! Pure data. Every mutation goes through a patch ([`PostUpdate`] /
//! [`CommentUpdate`]) that carries only the fields that change, and the patches
//! are produced by the lifecycle transition function or by the reducer.

use super::identifiers::{LocalId, RemoteId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Author of a comment or reply. Shared by reference between posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Server-side user id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Avatar image URL, if the user has one.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Author {
    /// Create an author without an avatar.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar_url: None,
        }
    }
}

// ===== Mode =====

/// Lifecycle mode of a post.
///
/// Sum type: exactly one mode at a time, and the edit-restore text only
/// exists while editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// A new comment whose first text is being typed. Never persisted.
    Creating,
    /// At rest.
    Default,
    /// Edit in progress; `previous_text` is restored on cancel.
    Editing {
        /// Committed text captured when the edit started.
        previous_text: String,
    },
    /// Save request in flight. The committed text already holds the new value.
    Saving,
    /// Last save attempt failed; text is kept for a retry.
    SaveError,
    /// Waiting for the user to confirm a delete (comments only).
    DeleteConfirm,
    /// Delete request in flight.
    Deleting,
    /// Last delete attempt failed; the post is intact.
    DeleteError,
}

impl Mode {
    /// Stable snake_case name, used by presentation for styling hooks.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Creating => "creating",
            Mode::Default => "default",
            Mode::Editing { .. } => "editing",
            Mode::Saving => "saving",
            Mode::SaveError => "save_error",
            Mode::DeleteConfirm => "delete_confirm",
            Mode::Deleting => "deleting",
            Mode::DeleteError => "delete_error",
        }
    }

    /// Whether an external operation is awaiting completion.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Mode::Saving | Mode::Deleting)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== Post =====

/// Fields shared by comments and replies.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Process-local identity.
    pub local_id: LocalId,
    /// Server identity; `None` until the first successful save.
    pub remote_id: Option<RemoteId>,
    /// Lifecycle mode.
    pub mode: Mode,
    /// Author, stamped from the server response on save.
    pub author: Option<Rc<Author>>,
    /// Creation date, stamped from the server response on save.
    pub date: DateTime<Utc>,
    /// Committed text.
    pub text: String,
    /// Edit buffer.
    pub new_text: String,
    /// Server supplied status or error text.
    pub message: String,
    /// Soft-delete tombstone. Hidden from rendering and layout.
    pub deleted: bool,
    generation: u64,
}

impl Post {
    /// A brand new comment in `creating` mode.
    pub fn draft(local_id: LocalId, author: Option<Rc<Author>>, date: DateTime<Utc>) -> Self {
        Self::with_mode(local_id, None, Mode::Creating, author, date, String::new())
    }

    /// A freshly submitted reply: not persisted, already `saving`.
    pub fn pending(
        local_id: LocalId,
        author: Option<Rc<Author>>,
        date: DateTime<Utc>,
        text: impl Into<String>,
    ) -> Self {
        Self::with_mode(local_id, None, Mode::Saving, author, date, text.into())
    }

    /// A post loaded from the server, at rest.
    pub fn persisted(
        local_id: LocalId,
        remote_id: RemoteId,
        author: Option<Rc<Author>>,
        date: DateTime<Utc>,
        text: impl Into<String>,
    ) -> Self {
        Self::with_mode(
            local_id,
            Some(remote_id),
            Mode::Default,
            author,
            date,
            text.into(),
        )
    }

    /// A post that exists only locally but is at rest (e.g. restored draft).
    pub fn local(
        local_id: LocalId,
        author: Option<Rc<Author>>,
        date: DateTime<Utc>,
        text: impl Into<String>,
    ) -> Self {
        Self::with_mode(local_id, None, Mode::Default, author, date, text.into())
    }

    fn with_mode(
        local_id: LocalId,
        remote_id: Option<RemoteId>,
        mode: Mode,
        author: Option<Rc<Author>>,
        date: DateTime<Utc>,
        text: String,
    ) -> Self {
        Self {
            local_id,
            remote_id,
            mode,
            author,
            date,
            text,
            new_text: String::new(),
            message: String::new(),
            deleted: false,
            generation: 0,
        }
    }

    /// Whether the post has ever been saved successfully.
    pub fn is_persisted(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Operation generation. Bumped each time a save or delete starts.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Whether `user` may edit or delete this post.
    ///
    /// Posts without an author (not yet stamped) belong to whoever is editing.
    pub fn is_owned_by(&self, user: Option<&Author>) -> bool {
        match (&self.author, user) {
            (None, _) => true,
            (Some(author), Some(user)) => author.id == user.id,
            (Some(_), None) => false,
        }
    }

    /// Apply a patch. Fields left `None` are untouched.
    ///
    /// A remote id is only taken if none is set yet; once assigned it is
    /// immutable and a conflicting value is dropped.
    pub fn apply(&mut self, update: PostUpdate) {
        let PostUpdate {
            mode,
            remote_id,
            author,
            date,
            text,
            new_text,
            message,
            deleted,
        } = update;

        if let Some(mode) = mode {
            self.mode = mode;
        }
        if let Some(remote_id) = remote_id {
            match self.remote_id {
                None => self.remote_id = Some(remote_id),
                Some(existing) if existing != remote_id => {
                    tracing::warn!(
                        local_id = %self.local_id,
                        %existing,
                        rejected = %remote_id,
                        "ignoring attempt to reassign remote id"
                    );
                }
                Some(_) => {}
            }
        }
        if let Some(author) = author {
            self.author = Some(author);
        }
        if let Some(date) = date {
            self.date = date;
        }
        if let Some(text) = text {
            self.text = text;
        }
        if let Some(new_text) = new_text {
            self.new_text = new_text;
        }
        if let Some(message) = message {
            self.message = message;
        }
        if let Some(deleted) = deleted {
            self.deleted = deleted;
        }
    }
}

/// Partial update of a [`Post`]. Only `Some` fields change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostUpdate {
    /// New mode.
    pub mode: Option<Mode>,
    /// Remote id from the authoritative response.
    pub remote_id: Option<RemoteId>,
    /// Author from the authoritative response.
    pub author: Option<Rc<Author>>,
    /// Date from the authoritative response.
    pub date: Option<DateTime<Utc>>,
    /// New committed text.
    pub text: Option<String>,
    /// New edit buffer.
    pub new_text: Option<String>,
    /// New status message.
    pub message: Option<String>,
    /// New tombstone flag.
    pub deleted: Option<bool>,
}

impl PostUpdate {
    /// Patch that only changes the mode.
    pub fn mode(mode: Mode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ===== Comment =====

/// A reply has exactly the shared post fields.
pub type Reply = Post;

/// Top-level comment attached to a document location.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Shared post fields.
    pub post: Post,
    /// Opaque key of the document location this comment belongs to.
    pub contentpath: String,
    /// Number of replies known to exist on the server.
    pub remote_reply_count: usize,
    /// Replies in insertion order, keyed by local id.
    pub replies: IndexMap<LocalId, Reply>,
    /// Buffer for the reply being composed.
    pub new_reply: String,
}

impl Comment {
    /// Wrap a post into a comment with no replies.
    pub fn new(post: Post, contentpath: impl Into<String>) -> Self {
        Self {
            post,
            contentpath: contentpath.into(),
            remote_reply_count: 0,
            replies: IndexMap::new(),
            new_reply: String::new(),
        }
    }

    /// Local id of the comment.
    pub fn local_id(&self) -> LocalId {
        self.post.local_id
    }

    /// Look up a reply by local id.
    pub fn reply(&self, reply_id: LocalId) -> Option<&Reply> {
        self.replies.get(&reply_id)
    }

    /// Replies that should be rendered (tombstones filtered out).
    pub fn visible_replies(&self) -> impl Iterator<Item = &Reply> {
        self.replies.values().filter(|reply| !reply.deleted)
    }

    /// Whether any reply is being edited or saved.
    ///
    /// Presentation hides the new-reply composer while this holds.
    pub fn has_reply_in_progress(&self) -> bool {
        self.replies
            .values()
            .any(|reply| matches!(reply.mode, Mode::Saving | Mode::Editing { .. }))
    }

    /// Apply a comment-level patch.
    pub fn apply(&mut self, update: CommentUpdate) {
        let CommentUpdate {
            post,
            new_reply,
            remote_reply_count,
        } = update;
        self.post.apply(post);
        if let Some(new_reply) = new_reply {
            self.new_reply = new_reply;
        }
        if let Some(count) = remote_reply_count {
            self.remote_reply_count = count;
        }
    }
}

/// Partial update of a [`Comment`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentUpdate {
    /// Changes to the shared post fields.
    pub post: PostUpdate,
    /// New reply-composer buffer.
    pub new_reply: Option<String>,
    /// New remote reply count.
    pub remote_reply_count: Option<usize>,
}

impl From<PostUpdate> for CommentUpdate {
    fn from(post: PostUpdate) -> Self {
        Self {
            post,
            ..Self::default()
        }
    }
}
