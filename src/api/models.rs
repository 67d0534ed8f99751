use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::ClientResult;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(UserId);
id_type!(PostId);
id_type!(CommentId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birthdate: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub cover_photo: Option<String>,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub following_count: Option<u64>,
    /// Relative to the viewer who fetched this copy.
    #[serde(default)]
    pub is_following: bool,
}

impl User {
    /// Initial shown in place of a missing profile picture.
    pub fn initial(&self) -> Option<char> {
        self.username.chars().next().map(|c| c.to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user: User,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub is_liked: bool,
}

impl Post {
    pub fn is_authored_by(&self, viewer: Option<UserId>) -> bool {
        viewer == Some(self.user.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default, alias = "post")]
    pub post_id: Option<PostId>,
    pub user: User,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// Edit/delete affordances are offered only to the author. The server
    /// still enforces ownership on its side.
    pub fn is_authored_by(&self, viewer: Option<UserId>) -> bool {
        viewer == Some(self.user.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub followers_count: u64,
    pub following_count: u64,
}

impl ProfileStats {
    /// Following/followers ratio; `None` when nobody follows the user.
    pub fn ratio(&self) -> Option<f64> {
        if self.followers_count == 0 {
            None
        } else {
            Some(self.following_count as f64 / self.followers_count as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: User,
    pub profile: ProfileStats,
}

/// The post list endpoints answer with a bare array, a paginated page, or a
/// `{posts: [...]}` wrapper depending on server configuration.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PostListPayload {
    Bare(Vec<Post>),
    Paged { results: Vec<Post> },
    Wrapped { posts: Vec<Post> },
}

impl PostListPayload {
    pub fn into_posts(self) -> Vec<Post> {
        match self {
            Self::Bare(posts) | Self::Paged { results: posts } | Self::Wrapped { posts } => posts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub password2: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SafetyReport {
    #[serde(default)]
    pub labels: Vec<String>,
}

/// `GET /auth/user/{id}/stats/` body.
#[derive(Debug, Deserialize)]
pub(crate) struct StatsPayload {
    pub followers: u64,
    pub following: u64,
}

impl From<StatsPayload> for ProfileStats {
    fn from(payload: StatsPayload) -> Self {
        Self {
            followers_count: payload.followers,
            following_count: payload.following,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FollowersPayload {
    pub followers: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FollowingPayload {
    pub following: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolvedUser {
    pub id: UserId,
}

/// A file attached to a multipart request.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Self {
            file_name,
            mime,
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
    pub caption: String,
    pub image: Option<Upload>,
}

impl NewPost {
    pub fn is_empty(&self) -> bool {
        self.caption.trim().is_empty() && self.image.is_none()
    }
}

/// Multipart body for `PUT /auth/user/profile/`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub profile_picture: Option<Upload>,
    pub cover_photo: Option<Upload>,
}

impl ProfileUpdate {
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("username", &self.username),
            ("email", &self.email),
            ("bio", &self.bio),
            ("location", &self.location),
            ("phone", &self.phone),
            ("website", &self.website),
            ("gender", &self.gender),
            ("birthdate", &self.birthdate),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.text_fields().is_empty() && self.profile_picture.is_none() && self.cover_photo.is_none()
    }
}
