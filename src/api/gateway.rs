use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::endpoints::Endpoint;
use super::models::*;
use super::SocialApi;
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::session::registration::{project_field_errors, registration_error, RegistrationForm};
use crate::session::Session;

pub const LOGIN_FAILED: &str = "Login failed";

enum Body {
    Empty,
    Json(Value),
    Form(Form),
}

struct Dispatched {
    response: Response,
    /// Credential the request carried, if any.
    token: Option<String>,
}

/// Non-2xx response, read eagerly so it can be inspected more than once.
struct Failure {
    status: StatusCode,
    body: Option<Value>,
    text: String,
}

impl Failure {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).ok();
        Self { status, body, text }
    }

    /// Human-readable message supplied by the server, if any.
    fn detail(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        for key in ["detail", "error", "message"] {
            if let Some(s) = body.get(key).and_then(Value::as_str) {
                return Some(s.to_string());
            }
        }
        body.get("non_field_errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn fallback(&self) -> String {
        let trimmed = self.text.trim();
        if trimmed.is_empty() || self.body.is_some() {
            self.status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        } else {
            let snippet: String = trimmed.chars().take(100).collect();
            format!("Unexpected error: {}...", snippet)
        }
    }

    fn into_error(self) -> ClientError {
        match self.status {
            StatusCode::UNAUTHORIZED => {
                ClientError::Auth(self.detail().unwrap_or_else(|| "Session expired".to_string()))
            }
            StatusCode::BAD_REQUEST => {
                let message = self
                    .detail()
                    .or_else(|| self.body.as_ref().and_then(project_field_errors))
                    .unwrap_or_else(|| "Request was rejected".to_string());
                ClientError::Validation(message)
            }
            status => ClientError::Api {
                status,
                detail: self.detail().unwrap_or_else(|| self.fallback()),
            },
        }
    }
}

/// HTTP facade over the PixaraX REST API.
///
/// Resolves each [`Endpoint`] against one base URL, attaches the session's
/// bearer credential, and turns failures into [`ClientError`]s. A 401 on a
/// request that carried a credential tears the session down. No retries.
#[derive(Clone)]
pub struct ApiGateway {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
}

impl ApiGateway {
    pub fn new(base_url: Url, session: Session) -> ClientResult<Self> {
        Self::with_timeout(base_url, session, None)
    }

    pub fn with_timeout(
        base_url: Url,
        session: Session,
        timeout: Option<Duration>,
    ) -> ClientResult<Self> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("pixara/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            session,
        })
    }

    pub fn from_config(config: &Config, session: Session) -> ClientResult<Self> {
        Self::with_timeout(config.base_url()?, session, config.timeout())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url_for(&self, endpoint: &Endpoint) -> ClientResult<Url> {
        Ok(self.base_url.join(&endpoint.path())?)
    }

    async fn dispatch(&self, endpoint: &Endpoint, body: Body) -> ClientResult<Dispatched> {
        let token = if endpoint.attaches_credential() {
            self.session.access_token()
        } else {
            None
        };

        if endpoint.requires_credential() && token.is_none() {
            return Err(ClientError::NotAuthenticated);
        }

        let url = self.url_for(endpoint)?;
        tracing::debug!("{} {}", endpoint.method(), url);

        let mut request = self.http.request(endpoint.method(), url);
        if let Some(ref token) = token {
            request = request.bearer_auth(token);
        }
        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Form(form) => request.multipart(form),
        };

        let response = request.send().await?;
        Ok(Dispatched { response, token })
    }

    async fn send(&self, endpoint: Endpoint, body: Body) -> ClientResult<Response> {
        let Dispatched { response, token } = self.dispatch(&endpoint, body).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = token {
                self.session.invalidate(&token);
            }
        }

        tracing::warn!(
            "{} {} failed with {}",
            endpoint.method(),
            endpoint.path(),
            status
        );
        Err(Failure::read(response).await.into_error())
    }

    async fn call<T: DeserializeOwned>(&self, endpoint: Endpoint, body: Body) -> ClientResult<T> {
        let response = self.send(endpoint, body).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn call_empty(&self, endpoint: Endpoint, body: Body) -> ClientResult<()> {
        self.send(endpoint, body).await?;
        Ok(())
    }

    async fn post_list(&self, endpoint: Endpoint) -> ClientResult<Vec<Post>> {
        let value: Value = self.call(endpoint, Body::Empty).await?;
        serde_json::from_value::<PostListPayload>(value)
            .map(PostListPayload::into_posts)
            .map_err(|e| ClientError::Unexpected(format!("post list is not a list: {}", e)))
    }

    // -- Authentication --

    /// Exchange a username/password for a credential pair.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<TokenPair> {
        let body = serde_json::to_value(LoginRequest { username, password })?;
        let Dispatched { response, .. } = self.dispatch(&Endpoint::Login, Body::Json(body)).await?;

        if response.status().is_success() {
            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let failure = Failure::read(response).await;
        Err(ClientError::Auth(
            failure.detail().unwrap_or_else(|| LOGIN_FAILED.to_string()),
        ))
    }

    pub async fn register(&self, form: &RegistrationForm) -> ClientResult<TokenPair> {
        let body = serde_json::to_value(form.to_request())?;
        let Dispatched { response, .. } =
            self.dispatch(&Endpoint::Register, Body::Json(body)).await?;

        if response.status().is_success() {
            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let failure = Failure::read(response).await;
        Err(ClientError::Validation(registration_error(
            failure.body.as_ref(),
        )))
    }

    pub async fn fetch_own_profile(&self) -> ClientResult<User> {
        self.call(Endpoint::OwnProfile, Body::Empty).await
    }

    pub async fn update_own_profile(&self, update: ProfileUpdate) -> ClientResult<User> {
        let mut form = Form::new();
        for (name, value) in update.text_fields() {
            form = form.text(name, value.to_string());
        }
        if let Some(upload) = update.profile_picture {
            form = form.part("profile_picture", file_part(upload)?);
        }
        if let Some(upload) = update.cover_photo {
            form = form.part("cover_photo", file_part(upload)?);
        }

        self.call(Endpoint::UpdateOwnProfile, Body::Form(form)).await
    }
}

fn file_part(upload: Upload) -> ClientResult<Part> {
    Ok(Part::bytes(upload.bytes)
        .file_name(upload.file_name)
        .mime_str(&upload.mime)?)
}

#[async_trait]
impl SocialApi for ApiGateway {
    async fn list_posts(&self) -> ClientResult<Vec<Post>> {
        self.post_list(Endpoint::ListPosts).await
    }

    async fn fetch_explore_posts(&self) -> ClientResult<Vec<Post>> {
        self.post_list(Endpoint::ExplorePosts).await
    }

    async fn list_user_posts(&self, user_id: UserId) -> ClientResult<Vec<Post>> {
        self.post_list(Endpoint::UserPosts(user_id)).await
    }

    async fn get_post(&self, post_id: PostId) -> ClientResult<Post> {
        self.call(Endpoint::GetPost(post_id), Body::Empty).await
    }

    async fn create_post(&self, post: NewPost) -> ClientResult<Post> {
        let mut form = Form::new().text("caption", post.caption);
        if let Some(image) = post.image {
            form = form.part("image", file_part(image)?);
        }
        self.call(Endpoint::CreatePost, Body::Form(form)).await
    }

    async fn edit_post(&self, post_id: PostId, caption: &str) -> ClientResult<Post> {
        self.call(
            Endpoint::EditPost(post_id),
            Body::Json(json!({ "caption": caption })),
        )
        .await
    }

    async fn delete_post(&self, post_id: PostId) -> ClientResult<()> {
        self.call_empty(Endpoint::DeletePost(post_id), Body::Empty)
            .await
    }

    async fn toggle_like(&self, post_id: PostId) -> ClientResult<()> {
        self.call_empty(Endpoint::ToggleLike(post_id), Body::Empty)
            .await
    }

    async fn get_user_profile(&self, user_id: UserId) -> ClientResult<UserProfile> {
        self.call(Endpoint::UserProfile(user_id), Body::Empty).await
    }

    async fn toggle_follow(&self, user_id: UserId) -> ClientResult<()> {
        self.call_empty(Endpoint::ToggleFollow(user_id), Body::Empty)
            .await
    }

    async fn get_user_stats(&self, user_id: UserId) -> ClientResult<ProfileStats> {
        let payload: StatsPayload = self.call(Endpoint::UserStats(user_id), Body::Empty).await?;
        Ok(payload.into())
    }

    async fn list_followers(&self, user_id: UserId) -> ClientResult<Vec<User>> {
        let payload: FollowersPayload = self.call(Endpoint::Followers(user_id), Body::Empty).await?;
        Ok(payload.followers)
    }

    async fn list_following(&self, user_id: UserId) -> ClientResult<Vec<User>> {
        let payload: FollowingPayload = self.call(Endpoint::Following(user_id), Body::Empty).await?;
        Ok(payload.following)
    }

    async fn resolve_user_id(&self, username: &str) -> ClientResult<UserId> {
        let resolved: ResolvedUser = self
            .call(Endpoint::ResolveUser(username.to_string()), Body::Empty)
            .await?;
        Ok(resolved.id)
    }

    async fn list_comments(&self, post_id: PostId) -> ClientResult<Vec<Comment>> {
        self.call(Endpoint::ListComments(post_id), Body::Empty)
            .await
    }

    async fn create_comment(&self, post_id: PostId, content: &str) -> ClientResult<Comment> {
        self.call(
            Endpoint::CreateComment(post_id),
            Body::Json(json!({ "content": content })),
        )
        .await
    }

    async fn edit_comment(&self, comment_id: CommentId, content: &str) -> ClientResult<Comment> {
        self.call(
            Endpoint::EditComment(comment_id),
            Body::Json(json!({ "content": content })),
        )
        .await
    }

    async fn delete_comment(&self, comment_id: CommentId) -> ClientResult<()> {
        self.call_empty(Endpoint::DeleteComment(comment_id), Body::Empty)
            .await
    }

    async fn check_comment_safety(&self, text: &str) -> ClientResult<SafetyReport> {
        self.call(
            Endpoint::PredictComment,
            Body::Json(json!({ "comment": text })),
        )
        .await
    }
}
