use super::{PostFeed, ViewContext};
use crate::api::models::{Post, PostId};
use crate::error::ClientResult;
use crate::interaction::{FollowOutcome, InteractionError, LikeState};

/// Discovery feed. Never fails to mount: the explore endpoint falls back to
/// the general feed, and that to an empty list.
pub struct ExploreView {
    feed: PostFeed,
}

impl ExploreView {
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

    pub async fn mount(&self) {
        let ticket = self.feed.begin();
        let posts = self.feed.context().api().list_explore_posts().await;
        self.feed.show(ticket, posts);
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

    pub fn dispose(&self) {
        self.feed.dispose();
    }
}
