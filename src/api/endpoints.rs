use reqwest::Method;

use super::models::{CommentId, PostId, UserId};

/// Every logical operation the client can perform against the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    Register,
    OwnProfile,
    UpdateOwnProfile,
    UserProfile(UserId),
    ToggleFollow(UserId),
    UserStats(UserId),
    Followers(UserId),
    Following(UserId),
    ResolveUser(String),
    ListPosts,
    ExplorePosts,
    UserPosts(UserId),
    CreatePost,
    GetPost(PostId),
    EditPost(PostId),
    DeletePost(PostId),
    ToggleLike(PostId),
    ListComments(PostId),
    CreateComment(PostId),
    EditComment(CommentId),
    DeleteComment(CommentId),
    PredictComment,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Self::OwnProfile
            | Self::UserProfile(_)
            | Self::UserStats(_)
            | Self::Followers(_)
            | Self::Following(_)
            | Self::ResolveUser(_)
            | Self::ListPosts
            | Self::ExplorePosts
            | Self::UserPosts(_)
            | Self::GetPost(_)
            | Self::ListComments(_) => Method::GET,
            Self::UpdateOwnProfile | Self::EditPost(_) | Self::EditComment(_) => Method::PUT,
            Self::DeletePost(_) | Self::DeleteComment(_) => Method::DELETE,
            Self::Login
            | Self::Register
            | Self::ToggleFollow(_)
            | Self::CreatePost
            | Self::ToggleLike(_)
            | Self::CreateComment(_)
            | Self::PredictComment => Method::POST,
        }
    }

    /// Path relative to the API base URL. Always ends with a slash; the
    /// server redirects (and drops the body) otherwise.
    pub fn path(&self) -> String {
        match self {
            Self::Login => "auth/login/".to_string(),
            Self::Register => "auth/register/".to_string(),
            Self::OwnProfile | Self::UpdateOwnProfile => "auth/user/profile/".to_string(),
            Self::UserProfile(id) => format!("auth/profile/{}/", id),
            Self::ToggleFollow(id) => format!("auth/follow/{}/", id),
            Self::UserStats(id) => format!("auth/user/{}/stats/", id),
            Self::Followers(id) => format!("auth/followers/{}/", id),
            Self::Following(id) => format!("auth/following/{}/", id),
            Self::ResolveUser(username) => {
                format!("auth/resolve-user/{}/", urlencode_segment(username))
            }
            Self::ListPosts | Self::CreatePost => "posts/".to_string(),
            Self::ExplorePosts => "posts/explore/".to_string(),
            Self::UserPosts(id) => format!("posts/user/{}/", id),
            Self::GetPost(id) | Self::EditPost(id) | Self::DeletePost(id) => {
                format!("posts/{}/", id)
            }
            Self::ToggleLike(id) => format!("posts/{}/like/", id),
            Self::ListComments(id) | Self::CreateComment(id) => format!("posts/{}/comments/", id),
            Self::EditComment(id) | Self::DeleteComment(id) => format!("comments/{}/", id),
            Self::PredictComment => "predict-comment/".to_string(),
        }
    }

    /// Whether the bearer credential is attached when the session holds one.
    pub fn attaches_credential(&self) -> bool {
        !matches!(self, Self::Login | Self::Register)
    }

    /// Operations that are not even attempted without a credential.
    pub fn requires_credential(&self) -> bool {
        matches!(
            self,
            Self::ToggleFollow(_) | Self::UserStats(_) | Self::PredictComment
        )
    }
}

fn urlencode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
