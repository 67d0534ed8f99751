//! Like and follow toggles.
//!
//! Likes are optimistic: the store changes before the request is sent and a
//! failure is handed back to the caller, who decides whether to revert.
//! Follows are pessimistic: nothing changes until the server acknowledges.

mod follow;
mod like;

use std::sync::Arc;

pub use follow::{FollowButton, FollowOutcome};
pub use like::LikeState;

use crate::api::models::{Post, PostId, UserId};
use crate::api::SocialApi;
use crate::error::ClientError;
use crate::store::EntityStore;

#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error("Post {0} is not loaded")]
    UnknownPost(PostId),

    /// The store already shows the toggled state; `previous` is what to
    /// restore if the caller chooses to.
    #[error("Failed to toggle like on post {post_id}: {source}")]
    LikeFailed {
        post_id: PostId,
        previous: LikeState,
        #[source]
        source: ClientError,
    },

    #[error("Failed to toggle follow for user {user_id}: {source}")]
    FollowFailed {
        user_id: UserId,
        #[source]
        source: ClientError,
    },
}

impl InteractionError {
    pub fn user_message(&self) -> String {
        match self {
            InteractionError::UnknownPost(_) => "That post is no longer available".to_string(),
            InteractionError::LikeFailed { source, .. }
            | InteractionError::FollowFailed { source, .. } => source.user_message(),
        }
    }
}

#[derive(Clone)]
pub struct InteractionController {
    api: Arc<dyn SocialApi>,
    store: EntityStore,
}

impl InteractionController {
    pub fn new(api: Arc<dyn SocialApi>, store: EntityStore) -> Self {
        Self { api, store }
    }

    /// Flip the like immediately, then tell the server.
    pub async fn toggle_like(&self, post_id: PostId) -> Result<LikeState, InteractionError> {
        let post = self
            .store
            .post(post_id)
            .ok_or(InteractionError::UnknownPost(post_id))?;
        let previous = LikeState::of(&post);
        let next = previous.toggled();
        self.store.update_post(post_id, |p| next.apply_to(p));

        match self.api.toggle_like(post_id).await {
            Ok(()) => Ok(next),
            Err(source) => {
                tracing::error!("Like on post {} failed: {}", post_id, source);
                Err(InteractionError::LikeFailed {
                    post_id,
                    previous,
                    source,
                })
            }
        }
    }

    /// Put a post back to the state captured before a failed toggle.
    pub fn revert_like(&self, post_id: PostId, previous: LikeState) -> Option<Post> {
        self.store.update_post(post_id, |p| previous.apply_to(p))
    }

    /// Toggle a follow once the server confirms. Re-entrant calls on the
    /// same button while a request is in flight are ignored.
    pub async fn toggle_follow(
        &self,
        button: &FollowButton,
    ) -> Result<FollowOutcome, InteractionError> {
        let Some(_busy) = button.try_begin() else {
            tracing::debug!("Follow for {} already in flight", button.user_id());
            return Ok(FollowOutcome::Ignored);
        };

        let user_id = button.user_id();
        let target = !button.is_following();

        match self.api.toggle_follow(user_id).await {
            Ok(()) => {
                button.settle(target);
                self.store.set_following(user_id, target);
                tracing::info!(
                    "{} user {}",
                    if target { "Followed" } else { "Unfollowed" },
                    user_id
                );
                Ok(FollowOutcome::Toggled(target))
            }
            Err(source) => {
                tracing::error!("Follow for user {} failed: {}", user_id, source);
                Err(InteractionError::FollowFailed { user_id, source })
            }
        }
    }
}
