pub mod endpoints;
pub mod gateway;
pub mod models;

use async_trait::async_trait;

use crate::error::ClientResult;
use models::*;

pub use endpoints::Endpoint;
pub use gateway::ApiGateway;

/// Social operations the controllers and views depend on.
///
/// [`ApiGateway`] is the HTTP implementation; tests substitute their own.
#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn list_posts(&self) -> ClientResult<Vec<Post>>;

    /// Raw explore endpoint. Prefer [`SocialApi::list_explore_posts`].
    async fn fetch_explore_posts(&self) -> ClientResult<Vec<Post>>;

    async fn list_user_posts(&self, user_id: UserId) -> ClientResult<Vec<Post>>;

    async fn get_post(&self, post_id: PostId) -> ClientResult<Post>;

    async fn create_post(&self, post: NewPost) -> ClientResult<Post>;

    async fn edit_post(&self, post_id: PostId, caption: &str) -> ClientResult<Post>;

    async fn delete_post(&self, post_id: PostId) -> ClientResult<()>;

    async fn toggle_like(&self, post_id: PostId) -> ClientResult<()>;

    async fn get_user_profile(&self, user_id: UserId) -> ClientResult<UserProfile>;

    async fn toggle_follow(&self, user_id: UserId) -> ClientResult<()>;

    /// Follower and following counts without the user record.
    async fn get_user_stats(&self, user_id: UserId) -> ClientResult<ProfileStats>;

    async fn list_followers(&self, user_id: UserId) -> ClientResult<Vec<User>>;

    async fn list_following(&self, user_id: UserId) -> ClientResult<Vec<User>>;

    async fn resolve_user_id(&self, username: &str) -> ClientResult<UserId>;

    async fn list_comments(&self, post_id: PostId) -> ClientResult<Vec<Comment>>;

    async fn create_comment(&self, post_id: PostId, content: &str) -> ClientResult<Comment>;

    async fn edit_comment(&self, comment_id: CommentId, content: &str) -> ClientResult<Comment>;

    async fn delete_comment(&self, comment_id: CommentId) -> ClientResult<()>;

    async fn check_comment_safety(&self, text: &str) -> ClientResult<SafetyReport>;

    /// Explore feed with fallback: a failing or non-list explore endpoint
    /// falls back to the general feed, and if that fails too the result is
    /// empty rather than an error.
    async fn list_explore_posts(&self) -> Vec<Post> {
        match self.fetch_explore_posts().await {
            Ok(posts) => return posts,
            Err(e) => tracing::warn!("Explore feed unavailable, using all posts: {}", e),
        }

        match self.list_posts().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("Fallback feed failed: {}", e);
                Vec::new()
            }
        }
    }
}
