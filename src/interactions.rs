//! Likes and comments on a single post.
//!
//! Like toggles are applied to the local copy immediately and tracked as
//! pending until the backend answers; a rejected request restores the
//! snapshot taken before the toggle. Comments are appended or removed only
//! after the backend acknowledges them.
//!
//! Each change is split in two. `PostDetail` hands out a request carrying
//! everything the backend call needs (post, author and actor ids), the
//! request is sent from a worker, and the answer is applied back to
//! whichever detail is on screen by then.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::api::ApiError;
use crate::data::InteractionService;
use crate::model::{Comment, Like, Notification, NotificationType, Post, Ref, User};

const PROVISIONAL_LIKE_ID: &str = "";

#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error("sign in to use this feature")]
    LoginRequired,
    #[error("another request for this post is still running")]
    Busy,
    #[error("a comment needs at least one character")]
    EmptyComment,
    #[error("only the author can delete this comment")]
    NotAuthor,
    #[error("comment {0} not found")]
    UnknownComment(String),
    #[error("no like change is pending")]
    NothingPending,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike { like_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked(Like),
    Unliked(Like),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeRequest {
    pub action: LikeAction,
    pub post_id: String,
    pub author_id: String,
    pub actor_id: String,
}

impl LikeRequest {
    pub fn label(&self) -> &'static str {
        match self.action {
            LikeAction::Like => "Like",
            LikeAction::Unlike { .. } => "Unlike",
        }
    }

    /// Calls the backend. A confirmed like notifies the post author.
    pub fn send(&self, service: &dyn InteractionService) -> Result<Like, ApiError> {
        match &self.action {
            LikeAction::Like => {
                let like = service.like(&self.post_id)?;
                notify_best_effort(
                    service,
                    notification_for(
                        NotificationType::Like,
                        &like.id,
                        &self.post_id,
                        &self.author_id,
                        &self.actor_id,
                    ),
                );
                Ok(like)
            }
            LikeAction::Unlike { like_id } => service.unlike(like_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRequest {
    pub post_id: String,
    pub author_id: String,
    pub actor_id: String,
    pub text: String,
}

impl CommentRequest {
    pub fn send(&self, service: &dyn InteractionService) -> Result<Comment, ApiError> {
        let comment = service.comment(&self.post_id, &self.text)?;
        notify_best_effort(
            service,
            notification_for(
                NotificationType::Comment,
                &comment.id,
                &self.post_id,
                &self.author_id,
                &self.actor_id,
            ),
        );
        Ok(comment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub post_id: String,
    pub comment_id: String,
}

impl DeleteRequest {
    pub fn send(&self, service: &dyn InteractionService) -> Result<Comment, ApiError> {
        service.delete_comment(&self.comment_id)
    }
}

#[derive(Debug, Clone)]
enum PendingLike {
    Like { user_id: String },
    Unlike { removed: Like, index: usize },
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    post: Post,
    busy: bool,
    pending_like: Option<PendingLike>,
    deleting: HashSet<String>,
}

impl PostDetail {
    pub fn new(post: Post) -> Self {
        Self {
            post,
            busy: false,
            pending_like: None,
            deleting: HashSet::new(),
        }
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn has_pending_like(&self) -> bool {
        self.pending_like.is_some()
    }

    pub fn is_own_post(&self, actor: Option<&User>) -> bool {
        actor.is_some_and(|user| !user.id.is_empty() && user.id == self.post.author.id)
    }

    pub fn liked_by(&self, actor: Option<&User>) -> bool {
        actor.is_some_and(|user| self.post.like_by(&user.id).is_some())
    }

    pub fn can_delete(&self, actor: Option<&User>, comment: &Comment) -> bool {
        actor.is_some_and(|user| comment.author.id() == user.id)
    }

    pub fn is_deleting(&self, comment_id: &str) -> bool {
        self.deleting.contains(comment_id)
    }

    pub fn begin_like_toggle(&mut self, actor: Option<&User>) -> Result<LikeRequest, InteractionError> {
        let actor = actor.ok_or(InteractionError::LoginRequired)?;
        if self.busy {
            return Err(InteractionError::Busy);
        }

        let existing = self
            .post
            .likes
            .iter()
            .position(|like| like.user == actor.id);
        let action = match existing {
            Some(index) => {
                let removed = self.post.likes.remove(index);
                let like_id = removed.id.clone();
                self.pending_like = Some(PendingLike::Unlike { removed, index });
                LikeAction::Unlike { like_id }
            }
            None => {
                self.post.likes.push(Like {
                    id: PROVISIONAL_LIKE_ID.to_string(),
                    user: actor.id.clone(),
                    post: self.post.id.clone(),
                });
                self.pending_like = Some(PendingLike::Like {
                    user_id: actor.id.clone(),
                });
                LikeAction::Like
            }
        };
        self.busy = true;
        debug!(post = %self.post.id, ?action, "like toggle pending");
        Ok(LikeRequest {
            action,
            post_id: self.post.id.clone(),
            author_id: self.post.author.id.clone(),
            actor_id: actor.id.clone(),
        })
    }

    pub fn confirm_like_toggle(&mut self, confirmed: Like) -> Result<LikeOutcome, InteractionError> {
        let pending = self
            .pending_like
            .take()
            .ok_or(InteractionError::NothingPending)?;
        self.busy = false;
        match pending {
            PendingLike::Like { user_id } => {
                match self
                    .post
                    .likes
                    .iter_mut()
                    .find(|like| like.id == PROVISIONAL_LIKE_ID && like.user == user_id)
                {
                    Some(slot) => *slot = confirmed.clone(),
                    None => self.post.likes.push(confirmed.clone()),
                }
                Ok(LikeOutcome::Liked(confirmed))
            }
            PendingLike::Unlike { removed, .. } => {
                self.post.likes.retain(|like| like.id != confirmed.id);
                Ok(LikeOutcome::Unliked(removed))
            }
        }
    }

    pub fn fail_like_toggle(&mut self) {
        match self.pending_like.take() {
            Some(PendingLike::Like { user_id }) => {
                self.post
                    .likes
                    .retain(|like| !(like.id == PROVISIONAL_LIKE_ID && like.user == user_id));
            }
            Some(PendingLike::Unlike { removed, index }) => {
                let index = index.min(self.post.likes.len());
                self.post.likes.insert(index, removed);
            }
            None => {}
        }
        self.busy = false;
    }

    /// Folds in a like the backend accepted for a toggle this detail never
    /// started, e.g. one sent before the post was reopened.
    pub fn merge_like(&mut self, like: Like) {
        if self.post.likes.iter().all(|existing| existing.id != like.id) {
            self.post.likes.push(like);
        }
    }

    pub fn forget_like(&mut self, like_id: &str) {
        self.post.likes.retain(|like| like.id != like_id);
    }

    pub fn prepare_comment(&self, actor: Option<&User>, text: &str) -> Result<CommentRequest, InteractionError> {
        let actor = actor.ok_or(InteractionError::LoginRequired)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(InteractionError::EmptyComment);
        }
        Ok(CommentRequest {
            post_id: self.post.id.clone(),
            author_id: self.post.author.id.clone(),
            actor_id: actor.id.clone(),
            text: text.to_string(),
        })
    }

    pub fn apply_comment(&mut self, comment: Comment) {
        if self.post.comments.iter().any(|existing| existing.id() == comment.id) {
            return;
        }
        self.post.comments.push(Ref::Record(comment));
    }

    pub fn begin_delete_comment(
        &mut self,
        actor: Option<&User>,
        comment_id: &str,
    ) -> Result<DeleteRequest, InteractionError> {
        let actor = actor.ok_or(InteractionError::LoginRequired)?;
        let comment = self
            .post
            .comment_records()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| InteractionError::UnknownComment(comment_id.to_string()))?;
        if comment.author.id() != actor.id {
            return Err(InteractionError::NotAuthor);
        }
        if !self.deleting.insert(comment_id.to_string()) {
            return Err(InteractionError::Busy);
        }
        Ok(DeleteRequest {
            post_id: self.post.id.clone(),
            comment_id: comment_id.to_string(),
        })
    }

    pub fn confirm_delete_comment(&mut self, comment_id: &str) {
        self.deleting.remove(comment_id);
        self.post.comments.retain(|comment| comment.id() != comment_id);
    }

    pub fn fail_delete_comment(&mut self, comment_id: &str) {
        self.deleting.remove(comment_id);
    }

    /// Swaps in a fresh copy from the backend. Deletes still in flight stay
    /// marked as long as their comment is still there.
    pub fn replace_post(&mut self, post: Post) {
        self.post = post;
        self.busy = false;
        self.pending_like = None;
        let post = &self.post;
        self.deleting
            .retain(|id| post.comments.iter().any(|comment| comment.id() == id.as_str()));
    }
}

/// Notification for the post author, or `None` when authors act on their
/// own post.
pub fn notification_for(
    kind: NotificationType,
    record_id: &str,
    post_id: &str,
    author_id: &str,
    actor_id: &str,
) -> Option<Notification> {
    if author_id == actor_id {
        return None;
    }
    Some(Notification {
        notification_type: kind,
        notification_type_id: record_id.to_string(),
        user_id: author_id.to_string(),
        post_id: post_id.to_string(),
    })
}

/// Sends a notification without surfacing failures.
pub fn notify_best_effort(service: &dyn InteractionService, notification: Option<Notification>) {
    let Some(notification) = notification else {
        return;
    };
    if let Err(err) = service.notify(&notification) {
        warn!(
            post = %notification.post_id,
            kind = ?notification.notification_type,
            error = %err,
            "notification not delivered"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::tests::post;
    use parking_lot::Mutex;
    use reqwest::StatusCode;

    #[derive(Default)]
    struct FakeInteractions {
        fail: bool,
        next_id: Mutex<u32>,
        sent_comments: Mutex<Vec<String>>,
        notified: Mutex<Vec<Notification>>,
        fail_notify: bool,
    }

    impl FakeInteractions {
        fn next(&self) -> String {
            let mut id = self.next_id.lock();
            *id += 1;
            format!("srv-{}", *id)
        }

        fn rejection() -> ApiError {
            ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".into(),
            }
        }
    }

    impl InteractionService for FakeInteractions {
        fn like(&self, post_id: &str) -> Result<Like, ApiError> {
            if self.fail {
                return Err(Self::rejection());
            }
            Ok(Like {
                id: self.next(),
                user: "me".into(),
                post: post_id.into(),
            })
        }

        fn unlike(&self, like_id: &str) -> Result<Like, ApiError> {
            if self.fail {
                return Err(Self::rejection());
            }
            Ok(Like {
                id: like_id.into(),
                user: "me".into(),
                post: "p".into(),
            })
        }

        fn comment(&self, post_id: &str, text: &str) -> Result<Comment, ApiError> {
            if self.fail {
                return Err(Self::rejection());
            }
            self.sent_comments.lock().push(text.to_string());
            Ok(comment(&self.next(), "me", post_id, text))
        }

        fn delete_comment(&self, comment_id: &str) -> Result<Comment, ApiError> {
            if self.fail {
                return Err(Self::rejection());
            }
            Ok(comment(comment_id, "me", "p", ""))
        }

        fn notify(&self, notification: &Notification) -> Result<(), ApiError> {
            if self.fail_notify {
                return Err(Self::rejection());
            }
            self.notified.lock().push(notification.clone());
            Ok(())
        }
    }

    fn comment(id: &str, author: &str, post_id: &str, text: &str) -> Comment {
        Comment {
            id: id.into(),
            comment: text.into(),
            author: Ref::Id(author.into()),
            post: post_id.into(),
            created_at: Default::default(),
            updated_at: Default::default(),
        }
    }

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            full_name: id.to_uppercase(),
            ..User::default()
        }
    }

    fn like_ids(detail: &PostDetail) -> Vec<String> {
        let mut ids: Vec<String> = detail.post().likes.iter().map(|l| l.id.clone()).collect();
        ids.sort();
        ids
    }

    /// Begin, send and settle a toggle in one go, the way a worker round
    /// trip ends up.
    fn round_trip(
        detail: &mut PostDetail,
        service: &FakeInteractions,
        actor: Option<&User>,
    ) -> Result<LikeOutcome, InteractionError> {
        let request = detail.begin_like_toggle(actor)?;
        match request.send(service) {
            Ok(like) => detail.confirm_like_toggle(like),
            Err(err) => {
                detail.fail_like_toggle();
                Err(err.into())
            }
        }
    }

    #[test]
    fn like_then_unlike_restores_the_like_set() {
        let service = FakeInteractions::default();
        let me = user("me");
        let mut detail = PostDetail::new(post("p", 1, 2));
        let before = like_ids(&detail);

        let outcome = round_trip(&mut detail, &service, Some(&me)).unwrap();
        assert!(matches!(outcome, LikeOutcome::Liked(ref like) if like.id == "srv-1"));
        assert!(detail.liked_by(Some(&me)));
        assert_eq!(detail.post().likes.len(), 3);

        let outcome = round_trip(&mut detail, &service, Some(&me)).unwrap();
        assert!(matches!(outcome, LikeOutcome::Unliked(ref like) if like.id == "srv-1"));
        assert_eq!(like_ids(&detail), before);
        assert!(!detail.is_busy());
    }

    #[test]
    fn like_request_captures_the_author_and_actor() {
        let mut detail = PostDetail::new(post("p", 1, 0));
        let request = detail.begin_like_toggle(Some(&user("me"))).unwrap();
        assert_eq!(
            request,
            LikeRequest {
                action: LikeAction::Like,
                post_id: "p".into(),
                author_id: "author".into(),
                actor_id: "me".into(),
            }
        );
        assert_eq!(request.label(), "Like");
    }

    #[test]
    fn like_notifies_author_but_not_self() {
        let service = FakeInteractions::default();
        let mut detail = PostDetail::new(post("p", 1, 0));
        round_trip(&mut detail, &service, Some(&user("me"))).unwrap();
        {
            let notified = service.notified.lock();
            assert_eq!(notified.len(), 1);
            assert_eq!(notified[0].notification_type, NotificationType::Like);
            assert_eq!(notified[0].user_id, "author");
        }

        let mut own = PostDetail::new(post("q", 1, 0));
        round_trip(&mut own, &service, Some(&user("author"))).unwrap();
        assert_eq!(service.notified.lock().len(), 1);
    }

    #[test]
    fn unlike_sends_no_notification() {
        let service = FakeInteractions::default();
        let me = user("me");
        let mut detail = PostDetail::new(post("p", 1, 0));
        round_trip(&mut detail, &service, Some(&me)).unwrap();
        round_trip(&mut detail, &service, Some(&me)).unwrap();
        assert_eq!(service.notified.lock().len(), 1);
    }

    #[test]
    fn failed_like_reverts_the_optimistic_projection() {
        let service = FakeInteractions {
            fail: true,
            ..Default::default()
        };
        let mut detail = PostDetail::new(post("p", 1, 1));
        let before = detail.post().likes.clone();
        let err = round_trip(&mut detail, &service, Some(&user("me"))).unwrap_err();
        assert!(matches!(err, InteractionError::Api(_)));
        assert_eq!(detail.post().likes, before);
        assert!(!detail.is_busy());
        assert!(service.notified.lock().is_empty());
    }

    #[test]
    fn failed_unlike_puts_the_like_back_in_place() {
        let mut detail = PostDetail::new(post("p", 1, 3));
        let before = detail.post().likes.clone();
        let me = User {
            id: "user-1".into(),
            ..User::default()
        };
        let request = detail.begin_like_toggle(Some(&me)).unwrap();
        assert_eq!(
            request.action,
            LikeAction::Unlike {
                like_id: "p-like-1".into()
            }
        );
        assert_eq!(detail.post().likes.len(), 2);
        detail.fail_like_toggle();
        assert_eq!(detail.post().likes, before);
    }

    #[test]
    fn busy_flag_blocks_reentrant_toggles() {
        let mut detail = PostDetail::new(post("p", 1, 0));
        let me = user("me");
        detail.begin_like_toggle(Some(&me)).unwrap();
        assert!(matches!(
            detail.begin_like_toggle(Some(&me)),
            Err(InteractionError::Busy)
        ));
    }

    #[test]
    fn anonymous_toggle_needs_login_and_changes_nothing() {
        let mut detail = PostDetail::new(post("p", 1, 1));
        assert!(matches!(
            detail.begin_like_toggle(None),
            Err(InteractionError::LoginRequired)
        ));
        assert_eq!(detail.post().likes.len(), 1);
        assert!(!detail.is_busy());
    }

    #[test]
    fn merged_like_is_added_once() {
        let mut detail = PostDetail::new(post("p", 1, 0));
        let like = Like {
            id: "srv-9".into(),
            user: "me".into(),
            post: "p".into(),
        };
        detail.merge_like(like.clone());
        detail.merge_like(like);
        assert_eq!(like_ids(&detail), vec!["srv-9"]);
        detail.forget_like("srv-9");
        assert!(detail.post().likes.is_empty());
    }

    #[test]
    fn comment_is_trimmed_sent_and_author_notified() {
        let service = FakeInteractions::default();
        let mut detail = PostDetail::new(post("p", 1, 0));
        let request = detail.prepare_comment(Some(&user("me")), "  I'm in ").unwrap();
        assert_eq!(request.author_id, "author");
        let created = request.send(&service).unwrap();
        detail.apply_comment(created.clone());

        assert_eq!(detail.post().comment_records().count(), 1);
        assert_eq!(*service.sent_comments.lock(), vec!["I'm in".to_string()]);
        let notified = service.notified.lock();
        assert_eq!(notified[0].notification_type, NotificationType::Comment);
        assert_eq!(notified[0].notification_type_id, created.id);
    }

    #[test]
    fn applying_the_same_comment_twice_keeps_one() {
        let mut detail = PostDetail::new(post("p", 1, 0));
        detail.apply_comment(comment("c1", "me", "p", "hi"));
        detail.apply_comment(comment("c1", "me", "p", "hi"));
        assert_eq!(detail.post().comments.len(), 1);
    }

    #[test]
    fn blank_comment_is_rejected_before_any_call() {
        let detail = PostDetail::new(post("p", 1, 0));
        assert!(matches!(
            detail.prepare_comment(Some(&user("me")), "   "),
            Err(InteractionError::EmptyComment)
        ));
        assert!(matches!(
            detail.prepare_comment(None, "hi"),
            Err(InteractionError::LoginRequired)
        ));
    }

    #[test]
    fn notification_failure_is_not_surfaced() {
        let service = FakeInteractions {
            fail_notify: true,
            ..Default::default()
        };
        let detail = PostDetail::new(post("p", 1, 0));
        let request = detail.prepare_comment(Some(&user("me")), "hello").unwrap();
        assert!(request.send(&service).is_ok());
    }

    #[test]
    fn delete_removes_only_after_acknowledgment() {
        let mut detail = PostDetail::new(post("p", 1, 0));
        detail.apply_comment(comment("c1", "me", "p", "first"));
        detail.apply_comment(comment("c2", "other", "p", "second"));
        let me = user("me");

        let failing = FakeInteractions {
            fail: true,
            ..Default::default()
        };
        let request = detail.begin_delete_comment(Some(&me), "c1").unwrap();
        assert!(detail.is_deleting("c1"));
        assert!(request.send(&failing).is_err());
        detail.fail_delete_comment("c1");
        assert!(!detail.is_deleting("c1"));
        assert_eq!(detail.post().comments.len(), 2);

        let service = FakeInteractions::default();
        let request = detail.begin_delete_comment(Some(&me), "c1").unwrap();
        request.send(&service).unwrap();
        detail.confirm_delete_comment(&request.comment_id);
        assert_eq!(detail.post().comments.len(), 1);
        assert!(matches!(
            detail.begin_delete_comment(Some(&me), "c2"),
            Err(InteractionError::NotAuthor)
        ));
    }

    #[test]
    fn concurrent_delete_of_same_comment_is_rejected() {
        let mut detail = PostDetail::new(post("p", 1, 0));
        detail.apply_comment(comment("c1", "me", "p", "first"));
        let me = user("me");
        detail.begin_delete_comment(Some(&me), "c1").unwrap();
        assert!(matches!(
            detail.begin_delete_comment(Some(&me), "c1"),
            Err(InteractionError::Busy)
        ));
        detail.confirm_delete_comment("c1");
        assert!(detail.post().comments.is_empty());
    }

    #[test]
    fn refresh_keeps_deletes_that_are_still_running() {
        let mut detail = PostDetail::new(post("p", 1, 0));
        detail.apply_comment(comment("c1", "me", "p", "first"));
        detail.apply_comment(comment("c2", "me", "p", "second"));
        let me = user("me");
        detail.begin_delete_comment(Some(&me), "c1").unwrap();
        detail.begin_delete_comment(Some(&me), "c2").unwrap();

        let mut fresh = post("p", 2, 0);
        fresh.comments.push(Ref::Record(comment("c1", "me", "p", "first")));
        detail.replace_post(fresh);
        assert!(detail.is_deleting("c1"));
        assert!(!detail.is_deleting("c2"));
    }
}
