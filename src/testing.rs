//! In-memory `SocialApi` used by unit tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::api::models::*;
use crate::api::SocialApi;
use crate::error::{ClientError, ClientResult};

pub(crate) fn user(id: u64) -> User {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "username": format!("user{}", id),
        "email": format!("user{}@example.com", id),
    }))
    .unwrap()
}

pub(crate) fn post(id: u64, author: u64) -> Post {
    Post {
        id: PostId(id),
        user: user(author),
        caption: format!("post {}", id),
        image: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        updated_at: None,
        likes_count: 0,
        comments_count: 0,
        is_liked: false,
    }
}

pub(crate) fn comment(id: u64, post_id: u64, author: u64) -> Comment {
    Comment {
        id: CommentId(id),
        post_id: Some(PostId(post_id)),
        user: user(author),
        content: format!("comment {}", id),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap(),
        updated_at: None,
    }
}

pub(crate) struct FakeApi {
    viewer: u64,
    posts: Mutex<Vec<Post>>,
    explore: Mutex<Result<Vec<Post>, String>>,
    comments: Mutex<Vec<Comment>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<(&'static str, String)>>,
    unsafe_words: Mutex<Vec<String>>,
    safety_delay: Mutex<Duration>,
    follow_gate: Option<Semaphore>,
    next_id: AtomicU64,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            viewer: 7,
            posts: Mutex::new(Vec::new()),
            explore: Mutex::new(Err("explore not configured".into())),
            comments: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            unsafe_words: Mutex::new(Vec::new()),
            safety_delay: Mutex::new(Duration::ZERO),
            follow_gate: None,
            next_id: AtomicU64::new(1000),
        }
    }

    pub fn with_posts(self, posts: Vec<Post>) -> Self {
        *self.posts.lock().unwrap() = posts;
        self
    }

    pub fn with_comments(self, comments: Vec<Comment>) -> Self {
        *self.comments.lock().unwrap() = comments;
        self
    }

    /// Follow requests block until [`FakeApi::release_follow`] is called.
    pub fn gate_follows(mut self) -> Self {
        self.follow_gate = Some(Semaphore::new(0));
        self
    }

    pub fn release_follow(&self) {
        if let Some(gate) = &self.follow_gate {
            gate.add_permits(1);
        }
    }

    pub fn set_explore(&self, result: Result<Vec<Post>, String>) {
        *self.explore.lock().unwrap() = result;
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn succeed(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn flag_word(&self, word: &str) {
        self.unsafe_words.lock().unwrap().push(word.to_string());
    }

    pub fn set_safety_delay(&self, delay: Duration) {
        *self.safety_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == op)
            .count()
    }

    pub fn call_args(&self, op: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == op)
            .map(|(_, arg)| arg.clone())
            .collect()
    }

    fn record(&self, op: &'static str, arg: impl ToString) -> ClientResult<()> {
        self.calls.lock().unwrap().push((op, arg.to_string()));
        if self.failing.lock().unwrap().contains(op) {
            return Err(ClientError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: format!("{} failed", op),
            });
        }
        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl SocialApi for FakeApi {
    async fn list_posts(&self) -> ClientResult<Vec<Post>> {
        self.record("list_posts", "")?;
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn fetch_explore_posts(&self) -> ClientResult<Vec<Post>> {
        self.record("fetch_explore_posts", "")?;
        self.explore
            .lock()
            .unwrap()
            .clone()
            .map_err(ClientError::Unexpected)
    }

    async fn list_user_posts(&self, user_id: UserId) -> ClientResult<Vec<Post>> {
        self.record("list_user_posts", user_id)?;
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user.id == user_id)
            .cloned()
            .collect())
    }

    async fn get_post(&self, post_id: PostId) -> ClientResult<Post> {
        self.record("get_post", post_id)?;
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
            .ok_or(ClientError::Api {
                status: StatusCode::NOT_FOUND,
                detail: "Not found.".into(),
            })
    }

    async fn create_post(&self, new_post: NewPost) -> ClientResult<Post> {
        self.record("create_post", &new_post.caption)?;
        let mut created = post(self.next_id(), self.viewer);
        created.caption = new_post.caption;
        created.image = new_post.image.map(|i| format!("/media/posts/{}", i.file_name));
        self.posts.lock().unwrap().insert(0, created.clone());
        Ok(created)
    }

    async fn edit_post(&self, post_id: PostId, caption: &str) -> ClientResult<Post> {
        self.record("edit_post", caption)?;
        let mut posts = self.posts.lock().unwrap();
        let found = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or(ClientError::Unexpected("missing".into()))?;
        found.caption = caption.to_string();
        Ok(found.clone())
    }

    async fn delete_post(&self, post_id: PostId) -> ClientResult<()> {
        self.record("delete_post", post_id)?;
        self.posts.lock().unwrap().retain(|p| p.id != post_id);
        Ok(())
    }

    async fn toggle_like(&self, post_id: PostId) -> ClientResult<()> {
        self.record("toggle_like", post_id)
    }

    async fn get_user_profile(&self, user_id: UserId) -> ClientResult<UserProfile> {
        self.record("get_user_profile", user_id)?;
        Ok(UserProfile {
            user: user(user_id.0),
            profile: ProfileStats {
                followers_count: 2,
                following_count: 1,
            },
        })
    }

    async fn toggle_follow(&self, user_id: UserId) -> ClientResult<()> {
        self.record("toggle_follow", user_id)?;
        if let Some(gate) = &self.follow_gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.failing.lock().unwrap().contains("toggle_follow_late") {
            return Err(ClientError::Api {
                status: StatusCode::BAD_REQUEST,
                detail: "You cannot follow yourself".into(),
            });
        }
        Ok(())
    }

    async fn get_user_stats(&self, user_id: UserId) -> ClientResult<ProfileStats> {
        self.record("get_user_stats", user_id)?;
        Ok(ProfileStats {
            followers_count: 2,
            following_count: 1,
        })
    }

    async fn list_followers(&self, user_id: UserId) -> ClientResult<Vec<User>> {
        self.record("list_followers", user_id)?;
        Ok(vec![user(1), user(2)])
    }

    async fn list_following(&self, user_id: UserId) -> ClientResult<Vec<User>> {
        self.record("list_following", user_id)?;
        Ok(vec![user(3)])
    }

    async fn resolve_user_id(&self, username: &str) -> ClientResult<UserId> {
        self.record("resolve_user_id", username)?;
        Ok(UserId(42))
    }

    async fn list_comments(&self, post_id: PostId) -> ClientResult<Vec<Comment>> {
        self.record("list_comments", post_id)?;
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == Some(post_id))
            .cloned()
            .collect())
    }

    async fn create_comment(&self, post_id: PostId, content: &str) -> ClientResult<Comment> {
        self.record("create_comment", content)?;
        let mut created = comment(self.next_id(), post_id.0, self.viewer);
        created.content = content.to_string();
        self.comments.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn edit_comment(&self, comment_id: CommentId, content: &str) -> ClientResult<Comment> {
        self.record("edit_comment", content)?;
        let mut comments = self.comments.lock().unwrap();
        let found = comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or(ClientError::Unexpected("missing".into()))?;
        found.content = content.to_string();
        Ok(found.clone())
    }

    async fn delete_comment(&self, comment_id: CommentId) -> ClientResult<()> {
        self.record("delete_comment", comment_id)?;
        self.comments.lock().unwrap().retain(|c| c.id != comment_id);
        Ok(())
    }

    async fn check_comment_safety(&self, text: &str) -> ClientResult<SafetyReport> {
        self.record("check_comment_safety", text)?;
        let delay = *self.safety_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let labels = self
            .unsafe_words
            .lock()
            .unwrap()
            .iter()
            .filter(|w| text.contains(w.as_str()))
            .map(|_| "toxic".to_string())
            .take(1)
            .collect();
        Ok(SafetyReport { labels })
    }
}
