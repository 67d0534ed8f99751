use super::{PostFeed, ViewContext};
use crate::api::models::{NewPost, Post, PostId};
use crate::error::{ClientError, ClientResult};
use crate::interaction::{FollowOutcome, InteractionError, LikeState};

pub const LOAD_FAILED: &str = "Failed to load posts. Please try again later.";
pub const EMPTY_POST: &str = "Add a caption or an image";

/// The main feed.
pub struct HomeView {
    feed: PostFeed,
}

impl HomeView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            feed: PostFeed::new(ctx),
        }
    }

    pub fn feed(&self) -> &PostFeed {
        &self.feed
    }

    pub fn posts(&self) -> Vec<Post> {
        self.feed.posts()
    }

    pub async fn mount(&self) -> ClientResult<()> {
        let ticket = self.feed.begin();
        let result = self.feed.context().api().list_posts().await;
        self.feed.finish(ticket, result, LOAD_FAILED)
    }

    /// Publish a post and put it at the top of the feed.
    pub async fn create_post(&self, new_post: NewPost) -> ClientResult<Post> {
        if new_post.is_empty() {
            return Err(ClientError::Validation(EMPTY_POST.to_string()));
        }
        self.feed.require_session()?;

        let post = self.feed.context().api().create_post(new_post).await?;
        tracing::info!("Created post {}", post.id);
        self.feed.context().store().insert_post(post.clone());
        self.feed.prepend(post.id);
        Ok(post)
    }

    pub async fn toggle_like(&self, post_id: PostId) -> Result<LikeState, InteractionError> {
        self.feed.toggle_like(post_id).await
    }

    pub async fn toggle_follow(&self, post_id: PostId) -> Result<FollowOutcome, InteractionError> {
        self.feed.toggle_follow(post_id).await
    }

    pub async fn delete_post(&self, post_id: PostId) -> ClientResult<()> {
        self.feed.delete_post(post_id).await
    }

    pub async fn edit_caption(&self, post_id: PostId, caption: &str) -> ClientResult<Post> {
        self.feed.edit_caption(post_id, caption).await
    }

    pub fn dispose(&self) {
        self.feed.dispose();
    }
}
