//! Shared fixtures for unit tests.
//!
//! `basic_comments_state` holds one saved comment (with one saved and one
//! unsaved reply) and one unsaved comment. Comment 1 is focused and pinned.

use crate::model::{Author, Comment, LocalId, Post, RemoteId};
use crate::state::CommentsState;
use chrono::{DateTime, TimeZone, Utc};
use std::rc::Rc;

pub const REMOTE_COMMENT: LocalId = LocalId::new(1);
pub const REMOTE_REPLY: LocalId = LocalId::new(2);
pub const LOCAL_REPLY: LocalId = LocalId::new(3);
pub const LOCAL_COMMENT: LocalId = LocalId::new(4);

pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).single().expect("valid timestamp")
}

pub fn test_user() -> Rc<Author> {
    Rc::new(Author::new(1, "test user"))
}

pub fn basic_comments_state() -> CommentsState {
    let user = test_user();

    let remote_reply = Post::persisted(
        REMOTE_REPLY,
        RemoteId::new(2),
        Some(user.clone()),
        epoch(),
        "a reply",
    );
    let local_reply = Post::local(LOCAL_REPLY, Some(user.clone()), epoch(), "another reply");

    let mut remote_comment = Comment::new(
        Post::persisted(
            REMOTE_COMMENT,
            RemoteId::new(1),
            Some(user.clone()),
            epoch(),
            "test text",
        ),
        "test_contentpath",
    );
    remote_comment.remote_reply_count = 1;
    remote_comment
        .replies
        .insert(remote_reply.local_id, remote_reply);
    remote_comment.replies.insert(local_reply.local_id, local_reply);

    let local_comment = Comment::new(
        Post::local(LOCAL_COMMENT, Some(user), epoch(), "unsaved comment"),
        "test_contentpath_2",
    );

    let mut state = CommentsState::new();
    state.comments.insert(REMOTE_COMMENT, remote_comment);
    state.comments.insert(LOCAL_COMMENT, local_comment);
    state.focused_comment = Some(REMOTE_COMMENT);
    state.pinned_comment = Some(REMOTE_COMMENT);
    state.remote_comment_count = 1;
    state
}
