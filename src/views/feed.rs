use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Lifecycle, LoadState, ViewContext};
use crate::api::models::{Post, PostId, UserId};
use crate::error::{ClientError, ClientResult};
use crate::interaction::{FollowButton, FollowOutcome, InteractionError, LikeState};
use crate::store::FetchTicket;

#[derive(Debug, Default)]
struct FeedState {
    ids: Vec<PostId>,
    load: LoadState,
    /// One follow control per author shown in this feed.
    follows: HashMap<UserId, Arc<FollowButton>>,
}

/// An ordered slice of post ids over the shared store, plus the post
/// actions every list screen offers.
pub struct PostFeed {
    ctx: ViewContext,
    lifecycle: Lifecycle,
    state: Mutex<FeedState>,
}

impl PostFeed {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            lifecycle: Lifecycle::new(),
            state: Mutex::new(FeedState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn context(&self) -> &ViewContext {
        &self.ctx
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }

    pub fn dispose(&self) {
        self.lifecycle.dispose();
    }

    /// Mark the feed loading and take a ticket for the fetch.
    pub fn begin(&self) -> FetchTicket {
        self.state().load = LoadState::Loading;
        self.ctx.store().begin_fetch()
    }

    /// Apply a fetch result. Ignored entirely once the view is disposed.
    pub fn finish(
        &self,
        ticket: FetchTicket,
        result: ClientResult<Vec<Post>>,
        failure: &str,
    ) -> ClientResult<()> {
        if self.is_disposed() {
            tracing::debug!("Dropping feed response for a disposed view");
            return Ok(());
        }

        match result {
            Ok(posts) => {
                self.show(ticket, posts);
                Ok(())
            }
            Err(e) => {
                tracing::error!("{}: {}", failure, e);
                self.state().load = LoadState::Failed(failure.to_string());
                Err(e)
            }
        }
    }

    /// Ingest posts and make them the feed's contents.
    pub(crate) fn show(&self, ticket: FetchTicket, posts: Vec<Post>) {
        if self.is_disposed() {
            return;
        }
        let ids = self.ctx.store().ingest_posts(ticket, posts);
        let mut state = self.state();
        state.ids = ids;
        state.load = LoadState::Ready;
    }

    /// Mark the feed failed without a fetch result.
    pub(crate) fn fail(&self, failure: &str) {
        if !self.is_disposed() {
            self.state().load = LoadState::Failed(failure.to_string());
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.state().load.clone()
    }

    pub fn ids(&self) -> Vec<PostId> {
        self.state().ids.clone()
    }

    /// Current posts in slice order, read through the store.
    pub fn posts(&self) -> Vec<Post> {
        let ids = self.ids();
        self.ctx.store().posts(&ids)
    }

    pub fn len(&self) -> usize {
        self.posts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn prepend(&self, id: PostId) {
        if self.is_disposed() {
            return;
        }
        let mut state = self.state();
        state.ids.retain(|existing| *existing != id);
        state.ids.insert(0, id);
    }

    pub async fn toggle_like(&self, post_id: PostId) -> Result<LikeState, InteractionError> {
        self.ctx.interactions().toggle_like(post_id).await
    }

    /// Follow control for the author of `post`. `None` on the viewer's own
    /// posts.
    pub fn follow_button(&self, post: &Post) -> Option<Arc<FollowButton>> {
        if self.can_modify(post) {
            return None;
        }
        Some(self.follow_button_for(post.user.id))
    }

    /// The feed's follow control for `user_id`, synced with the store.
    pub(crate) fn follow_button_for(&self, user_id: UserId) -> Arc<FollowButton> {
        let following = self
            .ctx
            .store()
            .user(user_id)
            .map(|u| u.is_following)
            .unwrap_or(false);
        let button = self
            .state()
            .follows
            .entry(user_id)
            .or_insert_with(|| Arc::new(FollowButton::new(user_id, following)))
            .clone();
        button.sync(following);
        button
    }

    /// Follow or unfollow the author of a post in this feed.
    pub async fn toggle_follow(&self, post_id: PostId) -> Result<FollowOutcome, InteractionError> {
        let post = self
            .ctx
            .store()
            .post(post_id)
            .ok_or(InteractionError::UnknownPost(post_id))?;
        match self.follow_button(&post) {
            Some(button) => self.ctx.interactions().toggle_follow(&button).await,
            None => Ok(FollowOutcome::Ignored),
        }
    }

    pub async fn delete_post(&self, post_id: PostId) -> ClientResult<()> {
        self.ctx.api().delete_post(post_id).await?;
        self.ctx.store().remove_post(post_id);
        if !self.is_disposed() {
            self.state().ids.retain(|id| *id != post_id);
        }
        tracing::info!("Deleted post {}", post_id);
        Ok(())
    }

    pub async fn edit_caption(&self, post_id: PostId, caption: &str) -> ClientResult<Post> {
        let edited = self.ctx.api().edit_post(post_id, caption).await?;
        let updated = self.ctx.store().update_post(post_id, |p| {
            p.caption = edited.caption.clone();
            p.updated_at = edited.updated_at;
        });
        match updated {
            Some(post) => Ok(post),
            None => {
                self.ctx.store().insert_post(edited.clone());
                Ok(edited)
            }
        }
    }

    /// True when the viewer may edit or delete `post`.
    pub fn can_modify(&self, post: &Post) -> bool {
        post.is_authored_by(self.ctx.viewer_id())
    }

    pub(crate) fn require_session(&self) -> ClientResult<()> {
        if self.ctx.session().is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }
}
