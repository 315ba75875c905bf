//! Tests for Coordinator.

use super::*;
use crate::layout::FixedAnnotation;
use crate::model::RemoteId;
use crate::test_harness::{
    basic_comments_state, epoch, test_user, LOCAL_COMMENT, LOCAL_REPLY, REMOTE_COMMENT,
    REMOTE_REPLY,
};
use std::collections::VecDeque;

/// Backend that answers from scripted queues and records what it was asked.
#[derive(Default)]
struct ScriptedBackend {
    saves: VecDeque<Result<SaveReceipt, SaveFailure>>,
    deletes: VecDeque<Result<(), DeleteFailure>>,
    saved_texts: Vec<String>,
    deleted: Vec<LocalId>,
    next_remote: u64,
}

impl ScriptedBackend {
    fn succeeding() -> Self {
        Self {
            next_remote: 100,
            ..Self::default()
        }
    }

    fn receipt(&mut self) -> SaveReceipt {
        self.next_remote += 1;
        SaveReceipt {
            remote_id: RemoteId::new(self.next_remote),
            author: test_user(),
            date: epoch(),
            message: None,
        }
    }

    fn save(&mut self, post: &Post) -> Result<SaveReceipt, SaveFailure> {
        self.saved_texts.push(post.text.clone());
        match self.saves.pop_front() {
            Some(scripted) => scripted,
            None => Ok(self.receipt()),
        }
    }

    fn delete(&mut self, post: &Post) -> Result<(), DeleteFailure> {
        self.deleted.push(post.local_id);
        self.deletes.pop_front().unwrap_or(Ok(()))
    }
}

impl Persistence for ScriptedBackend {
    fn save_comment(&mut self, comment: &Comment) -> Result<SaveReceipt, SaveFailure> {
        self.save(&comment.post)
    }

    fn delete_comment(&mut self, comment: &Comment) -> Result<(), DeleteFailure> {
        self.delete(&comment.post)
    }

    fn save_reply(&mut self, _comment: &Comment, reply: &Post) -> Result<SaveReceipt, SaveFailure> {
        self.save(reply)
    }

    fn delete_reply(&mut self, _comment: &Comment, reply: &Post) -> Result<(), DeleteFailure> {
        self.delete(reply)
    }
}

fn me() -> Option<Author> {
    Some((*test_user()).clone())
}

fn loaded() -> Coordinator {
    Coordinator::with_state(basic_comments_state(), me(), LayoutParams::default())
}

fn anchor(position: f64) -> (Rc<FixedAnnotation>, Rc<dyn Annotation>) {
    let annotation = Rc::new(FixedAnnotation::new(position));
    let handle: Rc<dyn Annotation> = annotation.clone();
    (annotation, handle)
}

fn mode(coordinator: &Coordinator, id: LocalId) -> Mode {
    coordinator
        .comment(id)
        .expect("comment should exist")
        .post
        .mode
        .clone()
}

// ===== Creating comments =====

#[test]
fn new_comment_is_focused_draft() {
    let mut coordinator = Coordinator::new(me(), LayoutParams::default());
    let (_anchor, handle) = anchor(300.0);

    let id = coordinator.create_comment("body", &handle);

    assert_eq!(mode(&coordinator, id), Mode::Creating);
    assert!(coordinator.state().is_focused(id));
    assert_eq!(coordinator.comment_count(), 1);
    assert_eq!(coordinator.remote_comment_count(), 0);
    assert_eq!(coordinator.layout().desired_position(id), Some(250.0));
}

#[test]
fn new_ids_continue_after_loaded_ones() {
    let mut coordinator = loaded();
    let (_anchor, handle) = anchor(0.0);

    let id = coordinator.create_comment("body", &handle);

    assert_eq!(id, LocalId::new(LOCAL_COMMENT.get() + 1));
}

#[test]
fn save_new_comment_end_to_end() {
    let mut coordinator = Coordinator::new(me(), LayoutParams::default());
    let mut backend = ScriptedBackend::succeeding();
    let (_anchor, handle) = anchor(300.0);
    let id = coordinator.create_comment("body", &handle);

    coordinator
        .comment_intent(id, Intent::EditText("Hello".into()))
        .unwrap();
    let op = coordinator
        .comment_intent(id, Intent::Save)
        .unwrap()
        .expect("save starts an operation");

    // Optimistic: text is committed while the request is in flight.
    let comment = coordinator.comment(id).unwrap();
    assert_eq!(comment.post.mode, Mode::Saving);
    assert_eq!(comment.post.text, "Hello");
    assert_eq!(comment.post.new_text, "");

    assert_eq!(coordinator.perform(&op, &mut backend).unwrap(), Completion::Applied);

    let comment = coordinator.comment(id).unwrap();
    assert_eq!(comment.post.mode, Mode::Default);
    assert_eq!(comment.post.remote_id, Some(RemoteId::new(101)));
    assert_eq!(coordinator.remote_comment_count(), 1);
    assert_eq!(backend.saved_texts, vec!["Hello".to_string()]);
}

#[test]
fn cancel_create_removes_comment_and_anchor() {
    let mut coordinator = Coordinator::new(me(), LayoutParams::default());
    let (anchor, handle) = anchor(300.0);
    let id = coordinator.create_comment("body", &handle);
    coordinator.mount_comment(id, 40.0).unwrap();

    let op = coordinator.comment_intent(id, Intent::CancelCreate).unwrap();

    assert!(op.is_none());
    assert!(coordinator.comment(id).is_none());
    assert!(anchor.is_deleted());
    assert_eq!(coordinator.state().focused_comment, None);
    assert!(!coordinator.layout().is_registered(id));
}

// ===== Saving =====

#[test]
fn failed_save_then_retry() {
    let mut coordinator = Coordinator::new(me(), LayoutParams::default());
    let mut backend = ScriptedBackend::succeeding();
    backend
        .saves
        .push_back(Err(SaveFailure::with_message("offline")));
    let (_anchor, handle) = anchor(300.0);
    let id = coordinator.create_comment("body", &handle);
    coordinator
        .comment_intent(id, Intent::EditText("Hello".into()))
        .unwrap();

    let op = coordinator.comment_intent(id, Intent::Save).unwrap().unwrap();
    coordinator.perform(&op, &mut backend).unwrap();

    let comment = coordinator.comment(id).unwrap();
    assert_eq!(comment.post.mode, Mode::SaveError);
    assert_eq!(comment.post.message, "offline");
    assert_eq!(comment.post.text, "Hello", "text survives the failure");
    assert_eq!(coordinator.remote_comment_count(), 0);

    let retry = coordinator.comment_intent(id, Intent::Retry).unwrap().unwrap();
    coordinator.perform(&retry, &mut backend).unwrap();

    assert_eq!(mode(&coordinator, id), Mode::Default);
    assert_eq!(coordinator.remote_comment_count(), 1);
    assert_eq!(backend.saved_texts, vec!["Hello", "Hello"]);
}

#[test]
fn stale_completion_is_dropped() {
    let mut coordinator = loaded();
    let first = coordinator
        .comment_intent(REMOTE_COMMENT, Intent::Save)
        .unwrap()
        .unwrap();
    coordinator
        .complete_save(&first, Err(SaveFailure::new()))
        .unwrap();
    let second = coordinator
        .comment_intent(REMOTE_COMMENT, Intent::Retry)
        .unwrap()
        .unwrap();

    // A duplicate answer for the first attempt arrives late.
    let late = coordinator
        .complete_save(&first, Err(SaveFailure::with_message("late")))
        .unwrap();

    assert_eq!(late, Completion::Stale);
    assert_eq!(mode(&coordinator, REMOTE_COMMENT), Mode::Saving);
    assert!(second.generation > first.generation);
}

#[test]
fn completion_after_removal_is_stale() {
    let mut coordinator = Coordinator::new(me(), LayoutParams::default());
    let (_anchor, handle) = anchor(0.0);
    let id = coordinator.create_comment("body", &handle);
    let op = PendingOp {
        target: Target::Comment(LocalId::new(id.get() + 10)),
        operation: Operation::Save,
        generation: 1,
    };

    let result = coordinator.complete_save(&op, Err(SaveFailure::new())).unwrap();

    assert_eq!(result, Completion::Stale);
}

#[test]
fn outcome_intents_need_a_ticket() {
    let mut coordinator = loaded();

    let err = coordinator
        .comment_intent(REMOTE_COMMENT, Intent::DeleteSucceeded)
        .unwrap_err();

    assert_eq!(err, CoordinatorError::OutcomeWithoutTicket("delete_succeeded"));
    assert_eq!(mode(&coordinator, REMOTE_COMMENT), Mode::Default);
}

#[test]
fn invalid_transition_is_reported() {
    let mut coordinator = loaded();

    let err = coordinator
        .comment_intent(REMOTE_COMMENT, Intent::CancelEdit)
        .unwrap_err();

    assert!(matches!(err, CoordinatorError::Transition(_)));
}

#[test]
fn unknown_comment_is_reported() {
    let mut coordinator = loaded();

    let err = coordinator
        .comment_intent(LocalId::new(99), Intent::StartEdit)
        .unwrap_err();

    assert_eq!(err, CoordinatorError::UnknownComment(LocalId::new(99)));
}

// ===== Ownership =====

#[test]
fn only_the_author_may_edit_or_delete() {
    let stranger = Some(Author::new(2, "someone else"));
    let mut coordinator =
        Coordinator::with_state(basic_comments_state(), stranger, LayoutParams::default());

    assert_eq!(
        coordinator.comment_intent(REMOTE_COMMENT, Intent::StartEdit),
        Err(CoordinatorError::NotAuthor(REMOTE_COMMENT))
    );
    assert_eq!(
        coordinator.reply_intent(REMOTE_COMMENT, REMOTE_REPLY, Intent::RequestDelete),
        Err(CoordinatorError::NotAuthor(REMOTE_REPLY))
    );
}

#[test]
fn anyone_may_resolve() {
    let stranger = Some(Author::new(2, "someone else"));
    let mut coordinator =
        Coordinator::with_state(basic_comments_state(), stranger, LayoutParams::default());

    let op = coordinator
        .comment_intent(REMOTE_COMMENT, Intent::Resolve)
        .unwrap()
        .expect("resolve starts a delete");

    assert_eq!(op.operation, Operation::Delete);
}

// ===== Deleting =====

#[test]
fn delete_comment_with_confirmation() {
    let mut coordinator = loaded();
    let mut backend = ScriptedBackend::succeeding();
    let (anchor, handle) = anchor(300.0);
    coordinator.set_annotation(REMOTE_COMMENT, &handle).unwrap();
    coordinator.mount_comment(REMOTE_COMMENT, 50.0).unwrap();

    let none = coordinator
        .comment_intent(REMOTE_COMMENT, Intent::RequestDelete)
        .unwrap();
    assert!(none.is_none(), "confirmation does not start a request");
    assert_eq!(mode(&coordinator, REMOTE_COMMENT), Mode::DeleteConfirm);

    let op = coordinator
        .comment_intent(REMOTE_COMMENT, Intent::ConfirmDelete)
        .unwrap()
        .unwrap();
    coordinator.perform(&op, &mut backend).unwrap();

    assert!(coordinator.comment(REMOTE_COMMENT).is_none());
    assert_eq!(coordinator.remote_comment_count(), 0);
    assert_eq!(coordinator.state().pinned_comment, None);
    assert_eq!(coordinator.layout().pinned(), None);
    assert!(anchor.is_deleted());
}

#[test]
fn failed_delete_keeps_comment() {
    let mut coordinator = loaded();
    let mut backend = ScriptedBackend::succeeding();
    backend
        .deletes
        .push_back(Err(DeleteFailure::with_message("forbidden")));

    coordinator
        .comment_intent(REMOTE_COMMENT, Intent::RequestDelete)
        .unwrap();
    let op = coordinator
        .comment_intent(REMOTE_COMMENT, Intent::ConfirmDelete)
        .unwrap()
        .unwrap();
    coordinator.perform(&op, &mut backend).unwrap();

    let comment = coordinator.comment(REMOTE_COMMENT).unwrap();
    assert_eq!(comment.post.mode, Mode::DeleteError);
    assert_eq!(comment.post.message, "forbidden");
    assert_eq!(coordinator.remote_comment_count(), 1);

    coordinator
        .comment_intent(REMOTE_COMMENT, Intent::CancelDelete)
        .unwrap();
    assert_eq!(mode(&coordinator, REMOTE_COMMENT), Mode::Default);
}

#[test]
fn reply_delete_leaves_tombstone_until_purged() {
    let mut coordinator = loaded();
    let mut backend = ScriptedBackend::succeeding();

    let op = coordinator
        .reply_intent(REMOTE_COMMENT, REMOTE_REPLY, Intent::RequestDelete)
        .unwrap()
        .expect("replies delete without confirmation");
    coordinator.perform(&op, &mut backend).unwrap();

    let comment = coordinator.comment(REMOTE_COMMENT).unwrap();
    assert!(comment.reply(REMOTE_REPLY).unwrap().deleted);
    assert_eq!(comment.remote_reply_count, 0);
    assert_eq!(comment.visible_replies().count(), 1);

    assert_eq!(coordinator.purge_deleted_replies(REMOTE_COMMENT), 1);
    assert!(coordinator.state().reply(REMOTE_COMMENT, REMOTE_REPLY).is_none());
    assert!(coordinator.state().reply(REMOTE_COMMENT, LOCAL_REPLY).is_some());
}

// ===== Replies =====

#[test]
fn submit_reply_is_optimistic() {
    let mut coordinator = loaded();
    let mut backend = ScriptedBackend::succeeding();
    coordinator.set_new_reply(REMOTE_COMMENT, "Me too").unwrap();

    let op = coordinator.submit_new_reply(REMOTE_COMMENT).unwrap();
    let Target::Reply { reply, .. } = op.target else {
        panic!("expected a reply target, got {:?}", op.target);
    };

    let comment = coordinator.comment(REMOTE_COMMENT).unwrap();
    assert_eq!(comment.new_reply, "");
    assert_eq!(comment.reply(reply).unwrap().mode, Mode::Saving);
    assert_eq!(comment.reply(reply).unwrap().text, "Me too");
    assert!(comment.has_reply_in_progress());
    assert!(reply > LOCAL_REPLY, "reply ids continue after loaded ones");

    coordinator.perform(&op, &mut backend).unwrap();

    let comment = coordinator.comment(REMOTE_COMMENT).unwrap();
    assert_eq!(comment.reply(reply).unwrap().mode, Mode::Default);
    assert_eq!(comment.remote_reply_count, 2);
}

#[test]
fn failed_reply_keeps_text_for_retry() {
    let mut coordinator = loaded();
    let mut backend = ScriptedBackend::succeeding();
    backend.saves.push_back(Err(SaveFailure::new()));
    coordinator.set_new_reply(REMOTE_COMMENT, "Me too").unwrap();

    let op = coordinator.submit_new_reply(REMOTE_COMMENT).unwrap();
    coordinator.perform(&op, &mut backend).unwrap();

    let Target::Reply { comment, reply } = op.target else {
        panic!("expected a reply target");
    };
    let failed = coordinator.state().reply(comment, reply).unwrap();
    assert_eq!(failed.mode, Mode::SaveError);
    assert_eq!(failed.text, "Me too");
    assert_eq!(coordinator.comment(comment).unwrap().remote_reply_count, 1);

    let retry = coordinator
        .reply_intent(comment, reply, Intent::Retry)
        .unwrap()
        .unwrap();
    coordinator.perform(&retry, &mut backend).unwrap();
    assert_eq!(coordinator.comment(comment).unwrap().remote_reply_count, 2);
}

#[test]
fn reply_needs_saved_comment() {
    let mut coordinator = loaded();
    coordinator.set_new_reply(LOCAL_COMMENT, "hi").unwrap();

    assert_eq!(
        coordinator.submit_new_reply(LOCAL_COMMENT),
        Err(CoordinatorError::NotPersisted(LOCAL_COMMENT))
    );
}

#[test]
fn empty_reply_is_rejected() {
    let mut coordinator = loaded();
    coordinator.set_new_reply(REMOTE_COMMENT, "   ").unwrap();

    assert_eq!(
        coordinator.submit_new_reply(REMOTE_COMMENT),
        Err(CoordinatorError::EmptyReply(REMOTE_COMMENT))
    );
}

#[test]
fn cancel_new_reply_clears_buffer() {
    let mut coordinator = loaded();
    coordinator.set_new_reply(REMOTE_COMMENT, "draft").unwrap();

    coordinator.cancel_new_reply(REMOTE_COMMENT).unwrap();

    assert_eq!(coordinator.comment(REMOTE_COMMENT).unwrap().new_reply, "");
}

#[test]
fn edit_reply_round_trip() {
    let mut coordinator = loaded();
    let mut backend = ScriptedBackend::succeeding();

    coordinator
        .reply_intent(REMOTE_COMMENT, REMOTE_REPLY, Intent::StartEdit)
        .unwrap();
    coordinator
        .reply_intent(REMOTE_COMMENT, REMOTE_REPLY, Intent::EditText("edited".into()))
        .unwrap();
    let op = coordinator
        .reply_intent(REMOTE_COMMENT, REMOTE_REPLY, Intent::Save)
        .unwrap()
        .unwrap();
    coordinator.perform(&op, &mut backend).unwrap();

    let reply = coordinator.state().reply(REMOTE_COMMENT, REMOTE_REPLY).unwrap();
    assert_eq!(reply.text, "edited");
    assert_eq!(reply.mode, Mode::Default);
    assert_eq!(reply.remote_id, Some(RemoteId::new(2)), "remote id never changes");
}

// ===== Layout integration =====

#[test]
fn mount_and_unmount_toggle_annotation() {
    let mut coordinator = loaded();
    let (anchor, handle) = anchor(300.0);
    coordinator.set_annotation(REMOTE_COMMENT, &handle).unwrap();

    coordinator.mount_comment(REMOTE_COMMENT, 40.0).unwrap();
    assert!(anchor.is_visible());
    assert!(coordinator.layout().is_registered(REMOTE_COMMENT));

    coordinator.unmount_comment(REMOTE_COMMENT);
    assert!(!anchor.is_visible());
    assert!(!coordinator.layout().is_registered(REMOTE_COMMENT));
}

#[test]
fn mount_unknown_comment_fails() {
    let mut coordinator = loaded();

    assert_eq!(
        coordinator.mount_comment(LocalId::new(42), 10.0),
        Err(CoordinatorError::UnknownComment(LocalId::new(42)))
    );
}

#[test]
fn loaded_comment_is_laid_out_once_anchored() {
    let mut coordinator = loaded();
    let (anchor, handle) = anchor(300.0);

    coordinator.set_annotation(REMOTE_COMMENT, &handle).unwrap();
    coordinator.mount_comment(REMOTE_COMMENT, 40.0).unwrap();
    coordinator.refresh_layout();

    assert!(anchor.is_visible());
    assert_eq!(coordinator.comment_position(REMOTE_COMMENT), Some(250.0));
}

#[test]
fn anchoring_a_mounted_card_shows_it() {
    let mut coordinator = loaded();
    coordinator.mount_comment(REMOTE_COMMENT, 40.0).unwrap();
    let (anchor, handle) = anchor(300.0);

    coordinator.set_annotation(REMOTE_COMMENT, &handle).unwrap();

    assert!(anchor.is_visible());
}

#[test]
fn set_annotation_on_unknown_comment_fails() {
    let mut coordinator = loaded();
    let (_anchor, handle) = anchor(300.0);

    assert_eq!(
        coordinator.set_annotation(LocalId::new(42), &handle),
        Err(CoordinatorError::UnknownComment(LocalId::new(42)))
    );
    assert!(coordinator.layout().annotation(LocalId::new(42)).is_none());
}

#[test]
fn loaded_selection_on_missing_comment_is_dropped() {
    let mut state = basic_comments_state();
    state.focused_comment = Some(LocalId::new(42));
    state.pinned_comment = Some(LocalId::new(42));

    let coordinator = Coordinator::with_state(state, me(), LayoutParams::default());

    assert_eq!(coordinator.state().focused_comment, None);
    assert_eq!(coordinator.state().pinned_comment, None);
    assert_eq!(coordinator.layout().pinned(), None);
}

#[test]
fn loaded_selection_on_deleted_comment_is_dropped() {
    let mut state = basic_comments_state();
    if let Some(comment) = state.comments.get_mut(&REMOTE_COMMENT) {
        comment.post.deleted = true;
    }

    let coordinator = Coordinator::with_state(state, me(), LayoutParams::default());

    assert_eq!(coordinator.state().focused_comment, None);
    assert_eq!(coordinator.state().pinned_comment, None);
}

#[test]
fn loaded_selection_on_live_comment_is_kept() {
    let coordinator = loaded();

    assert_eq!(coordinator.state().focused_comment, Some(REMOTE_COMMENT));
    assert_eq!(coordinator.layout().pinned(), Some(REMOTE_COMMENT));
}

#[test]
fn pinning_follows_state_validation() {
    let mut coordinator = loaded();

    coordinator.set_pinned_comment(Some(LocalId::new(42)));
    assert_eq!(coordinator.layout().pinned(), Some(REMOTE_COMMENT));

    coordinator.set_pinned_comment(Some(LOCAL_COMMENT));
    assert_eq!(coordinator.layout().pinned(), Some(LOCAL_COMMENT));

    coordinator.set_pinned_comment(None);
    assert_eq!(coordinator.layout().pinned(), None);
}

#[test]
fn layout_positions_mounted_cards() {
    let mut coordinator = Coordinator::new(me(), LayoutParams::default());
    let (_a, first_anchor) = anchor(150.0);
    let (_b, second_anchor) = anchor(160.0);
    let first = coordinator.create_comment("body", &first_anchor);
    let second = coordinator.create_comment("body", &second_anchor);
    coordinator.mount_comment(first, 80.0).unwrap();
    coordinator.mount_comment(second, 60.0).unwrap();

    assert!(coordinator.refresh_layout());

    assert_eq!(coordinator.comment_position(first), Some(100.0));
    assert_eq!(coordinator.comment_position(second), Some(200.0));

    coordinator.report_height(first, 100.0);
    coordinator.refresh_layout();
    assert_eq!(coordinator.comment_position(second), Some(220.0));
}
