use std::sync::{Arc, Mutex, MutexGuard};

use super::{PostFeed, ViewContext};
use crate::api::models::{Post, PostId, ProfileStats, ProfileUpdate, User, UserId};
use crate::error::{ClientError, ClientResult};
use crate::interaction::{FollowButton, FollowOutcome, InteractionError, LikeState};

pub const LOAD_FAILED: &str = "Failed to load profile";

#[derive(Default)]
struct ProfileState {
    stats: Option<ProfileStats>,
    mounted: bool,
}

/// A user's profile header plus their posts.
pub struct ProfileView {
    user_id: UserId,
    feed: PostFeed,
    state: Mutex<ProfileState>,
}

impl ProfileView {
    pub fn new(ctx: ViewContext, user_id: UserId) -> Self {
        Self {
            user_id,
            feed: PostFeed::new(ctx),
            state: Mutex::new(ProfileState::default()),
        }
    }

    /// The signed-in viewer's own profile.
    pub fn own(ctx: ViewContext) -> ClientResult<Self> {
        let user_id = ctx.viewer_id().ok_or(ClientError::NotAuthenticated)?;
        Ok(Self::new(ctx, user_id))
    }

    fn state(&self) -> MutexGuard<'_, ProfileState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ctx(&self) -> &ViewContext {
        self.feed.context()
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn feed(&self) -> &PostFeed {
        &self.feed
    }

    pub fn is_own(&self) -> bool {
        self.ctx().viewer_id() == Some(self.user_id)
    }

    /// Latest known copy of the profile owner.
    pub fn user(&self) -> Option<User> {
        self.ctx().store().user(self.user_id)
    }

    pub fn stats(&self) -> Option<ProfileStats> {
        self.state().stats
    }

    /// Present only on someone else's profile once mounted. The state
    /// comes from the store, since the profile endpoint never reports it.
    pub fn follow_button(&self) -> Option<Arc<FollowButton>> {
        if !self.state().mounted || self.is_own() {
            return None;
        }
        Some(self.feed.follow_button_for(self.user_id))
    }

    pub fn posts(&self) -> Vec<Post> {
        self.feed.posts()
    }

    /// Fetch the profile header and the post grid together.
    pub async fn mount(&self) -> ClientResult<()> {
        let ticket = self.feed.begin();
        let api = self.ctx().api();
        let (profile, posts) = tokio::join!(
            api.get_user_profile(self.user_id),
            api.list_user_posts(self.user_id)
        );

        if self.feed.is_disposed() {
            return Ok(());
        }

        let profile = match profile {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!("Loading profile {} failed: {}", self.user_id, e);
                self.feed.fail(LOAD_FAILED);
                return Err(e);
            }
        };

        self.ctx().store().ingest_profile_user(ticket, profile.user);
        let result = self.feed.finish(ticket, posts, LOAD_FAILED);
        let mut state = self.state();
        state.stats = Some(profile.profile);
        state.mounted = true;
        result
    }

    /// Re-read the follower counts without refetching the profile.
    pub async fn refresh_stats(&self) -> ClientResult<ProfileStats> {
        let stats = self.ctx().api().get_user_stats(self.user_id).await?;
        if !self.feed.is_disposed() {
            self.state().stats = Some(stats);
        }
        Ok(stats)
    }

    /// Follow or unfollow the profile owner. Follower count moves with a
    /// confirmed change.
    pub async fn toggle_follow(&self) -> Result<FollowOutcome, InteractionError> {
        let Some(button) = self.follow_button() else {
            return Ok(FollowOutcome::Ignored);
        };

        let outcome = self.ctx().interactions().toggle_follow(&button).await?;
        if let FollowOutcome::Toggled(following) = outcome {
            if !self.feed.is_disposed() {
                if let Some(stats) = self.state().stats.as_mut() {
                    stats.followers_count = if following {
                        stats.followers_count + 1
                    } else {
                        stats.followers_count.saturating_sub(1)
                    };
                }
            }
        }
        Ok(outcome)
    }

    pub async fn toggle_like(&self, post_id: PostId) -> Result<LikeState, InteractionError> {
        self.feed.toggle_like(post_id).await
    }

    pub async fn delete_post(&self, post_id: PostId) -> ClientResult<()> {
        self.feed.delete_post(post_id).await
    }

    /// Edit the viewer's own profile from the profile screen.
    pub async fn update_profile(&self, update: ProfileUpdate) -> ClientResult<User> {
        if !self.is_own() {
            return Err(ClientError::Validation(
                "You can only edit your own profile".to_string(),
            ));
        }

        self.ctx().sessions().update_profile(update).await
    }

    pub async fn followers(&self) -> ClientResult<Vec<User>> {
        self.ctx().api().list_followers(self.user_id).await
    }

    pub async fn following(&self) -> ClientResult<Vec<User>> {
        self.ctx().api().list_following(self.user_id).await
    }

    pub fn dispose(&self) {
        self.feed.dispose();
    }
}
