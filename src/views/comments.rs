use std::sync::{Mutex, MutexGuard};
use tokio::sync::{watch, Mutex as AsyncMutex};

use super::{Lifecycle, LoadState, ViewContext};
use crate::api::models::{Comment, CommentId, PostId};
use crate::error::{ClientError, ClientResult};
use crate::safety::{CommentDraft, DraftState, DraftStatus, UNSAFE_COMMENT};

pub const EMPTY_COMMENT: &str = "Comment cannot be empty";
pub const NOT_AUTHOR: &str = "You can only change your own comments";
pub const LOAD_FAILED: &str = "Failed to load comments";

/// What the viewer may do with one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentAffordances {
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Default)]
struct ThreadState {
    comments: Vec<Comment>,
    load: LoadState,
}

/// Comments under one post, with a safety-checked draft for new ones.
pub struct CommentThread {
    post_id: PostId,
    ctx: ViewContext,
    lifecycle: Lifecycle,
    state: Mutex<ThreadState>,
    draft: AsyncMutex<CommentDraft>,
    draft_status: watch::Receiver<DraftStatus>,
}

impl CommentThread {
    pub fn new(ctx: ViewContext, post_id: PostId) -> Self {
        let draft = CommentDraft::new(ctx.api().clone(), ctx.debounce());
        let draft_status = draft.subscribe();
        Self {
            post_id,
            ctx,
            lifecycle: Lifecycle::new(),
            state: Mutex::new(ThreadState::default()),
            draft: AsyncMutex::new(draft),
            draft_status,
        }
    }

    fn state(&self) -> MutexGuard<'_, ThreadState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.state().comments.clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.state().load.clone()
    }

    pub async fn mount(&self) -> ClientResult<()> {
        self.state().load = LoadState::Loading;
        let result = self.ctx.api().list_comments(self.post_id).await;
        if self.lifecycle.is_disposed() {
            return Ok(());
        }

        let mut state = self.state();
        match result {
            Ok(comments) => {
                state.comments = comments;
                state.load = LoadState::Ready;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Loading comments for post {} failed: {}", self.post_id, e);
                state.load = LoadState::Failed(LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    pub fn affordances(&self, comment: &Comment) -> CommentAffordances {
        let mine = comment.is_authored_by(self.ctx.viewer_id());
        CommentAffordances {
            can_edit: mine,
            can_delete: mine,
        }
    }

    pub fn draft_state(&self) -> DraftState {
        self.draft_status.borrow().state
    }

    /// Replace the draft text and schedule a safety check.
    pub async fn edit_draft(&self, text: impl Into<String>) -> DraftState {
        self.draft.lock().await.edit(text)
    }

    /// Wait for the pending safety check on the draft, if any.
    pub async fn draft_settled(&self) -> DraftState {
        self.draft.lock().await.settled().await
    }

    /// Post the draft. The final text is checked once more; only an
    /// `Unsafe` verdict stops it.
    pub async fn submit(&self) -> ClientResult<Comment> {
        let mut draft = self.draft.lock().await;
        let content = draft.text().to_string();
        if content.trim().is_empty() {
            return Err(ClientError::Validation(EMPTY_COMMENT.to_string()));
        }
        if !self.ctx.session().is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }

        let verdict = draft.final_verdict().await;
        if verdict.blocks_submission() {
            tracing::info!("Refused flagged comment on post {}", self.post_id);
            return Err(ClientError::Validation(UNSAFE_COMMENT.to_string()));
        }

        let comment = self
            .ctx
            .api()
            .create_comment(self.post_id, &content)
            .await
            .map_err(|e| {
                tracing::error!("Posting comment on {} failed: {}", self.post_id, e);
                e
            })?;
        draft.clear();

        self.adjust_count(1);
        if !self.lifecycle.is_disposed() {
            self.state().comments.insert(0, comment.clone());
        }
        Ok(comment)
    }

    pub async fn edit_comment(&self, comment_id: CommentId, content: &str) -> ClientResult<Comment> {
        if content.trim().is_empty() {
            return Err(ClientError::Validation(EMPTY_COMMENT.to_string()));
        }
        self.check_ownership(comment_id, |a| a.can_edit)?;

        let updated = self.ctx.api().edit_comment(comment_id, content).await?;
        if !self.lifecycle.is_disposed() {
            let mut state = self.state();
            if let Some(slot) = state.comments.iter_mut().find(|c| c.id == comment_id) {
                *slot = updated.clone();
            }
        }
        Ok(updated)
    }

    pub async fn delete_comment(&self, comment_id: CommentId) -> ClientResult<()> {
        self.check_ownership(comment_id, |a| a.can_delete)?;

        self.ctx.api().delete_comment(comment_id).await?;
        self.adjust_count(-1);
        if !self.lifecycle.is_disposed() {
            self.state().comments.retain(|c| c.id != comment_id);
        }
        Ok(())
    }

    pub fn dispose(&self) {
        self.lifecycle.dispose();
    }

    fn check_ownership(
        &self,
        comment_id: CommentId,
        allowed: impl Fn(CommentAffordances) -> bool,
    ) -> ClientResult<()> {
        if !self.ctx.session().is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        let comment = self
            .state()
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .cloned();
        match comment {
            Some(c) if allowed(self.affordances(&c)) => Ok(()),
            Some(_) => Err(ClientError::Validation(NOT_AUTHOR.to_string())),
            None => Err(ClientError::Unexpected(format!(
                "comment {} is not loaded",
                comment_id
            ))),
        }
    }

    fn adjust_count(&self, delta: i64) {
        self.ctx.store().update_post(self.post_id, |p| {
            p.comments_count = if delta >= 0 {
                p.comments_count + delta as u64
            } else {
                p.comments_count.saturating_sub(delta.unsigned_abs())
            };
        });
    }
}
