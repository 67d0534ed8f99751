//! In-process stand-in for the PixaraX REST API.
//!
//! Binds to an ephemeral port, records every request it sees and answers
//! with the same shapes the real server uses.

use axum::extract::{Multipart, Path, Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;

pub const NOVA_ID: u64 = 7;
pub const NOVA_ACCESS: &str = "A";
pub const NOVA_REFRESH: &str = "R";
pub const ORBIT_ID: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExploreMode {
    List,
    NotAList,
    Fail,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
}

struct MockState {
    requests: Vec<Recorded>,
    users: HashMap<u64, Value>,
    passwords: HashMap<String, (String, u64)>,
    tokens: HashMap<String, u64>,
    posts: Vec<Value>,
    comments: Vec<Value>,
    likes: HashMap<u64, HashSet<u64>>,
    follows: HashSet<(u64, u64)>,
    explore: ExploreMode,
    posts_fail: bool,
    toxic_words: Vec<String>,
    uploads: Vec<(String, String)>,
    next_id: u64,
}

#[derive(Clone)]
pub struct MockApi(Arc<Mutex<MockState>>);

fn user_json(id: u64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{}@example.com", username),
        "bio": "",
        "location": "",
        "phone": null,
        "website": null,
        "gender": null,
        "birthdate": null,
        "interests": "",
        "profile_picture": null,
        "cover_photo": null,
        "date_joined": "2024-03-01T10:00:00Z",
        "is_following": false
    })
}

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

impl MockApi {
    fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(NOVA_ID, user_json(NOVA_ID, "nova"));
        users.insert(ORBIT_ID, user_json(ORBIT_ID, "orbit"));

        let mut passwords = HashMap::new();
        passwords.insert("nova".to_string(), ("secret".to_string(), NOVA_ID));
        passwords.insert("orbit".to_string(), ("hunter22".to_string(), ORBIT_ID));

        let state = MockState {
            requests: Vec::new(),
            users,
            passwords,
            tokens: HashMap::new(),
            posts: Vec::new(),
            comments: Vec::new(),
            likes: HashMap::new(),
            follows: HashSet::new(),
            explore: ExploreMode::List,
            posts_fail: false,
            toxic_words: vec!["idiot".to_string()],
            uploads: Vec::new(),
            next_id: 100,
        };
        let api = Self(Arc::new(Mutex::new(state)));
        api.seed_post(1, ORBIT_ID, "first light");
        api.seed_post(2, NOVA_ID, "night market");
        api.seed_comment(10, 1, NOVA_ID, "gorgeous");
        api.seed_comment(11, 1, ORBIT_ID, "thanks!");
        api
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }

    fn seed_post(&self, id: u64, author: u64, caption: &str) {
        let mut state = self.lock();
        let user = state.users[&author].clone();
        state.posts.insert(
            0,
            json!({
                "id": id,
                "user": user,
                "caption": caption,
                "image": null,
                "created_at": "2024-03-02T18:30:00Z",
                "updated_at": "2024-03-02T18:30:00Z",
                "likes_count": 0,
                "comments_count": 0,
                "is_liked": false
            }),
        );
    }

    fn seed_comment(&self, id: u64, post_id: u64, author: u64, content: &str) {
        let mut state = self.lock();
        let user = state.users[&author].clone();
        state.comments.push(json!({
            "id": id,
            "post": post_id,
            "user": user,
            "content": content,
            "created_at": "2024-03-02T19:00:00Z",
            "updated_at": "2024-03-02T19:00:00Z"
        }));
    }

    pub fn set_explore(&self, mode: ExploreMode) {
        self.lock().explore = mode;
    }

    pub fn fail_posts(&self, fail: bool) {
        self.lock().posts_fail = fail;
    }

    /// Drop every issued token, as if they all expired.
    pub fn expire_tokens(&self) {
        self.lock().tokens.clear();
    }

    /// Make `token` valid for `user_id` without a login.
    pub fn issue_token(&self, token: &str, user_id: u64) {
        self.lock().tokens.insert(token.to_string(), user_id);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn uploads(&self) -> Vec<(String, String)> {
        self.lock().uploads.clone()
    }

    pub fn is_following(&self, follower: u64, followee: u64) -> bool {
        self.lock().follows.contains(&(follower, followee))
    }

    fn viewer(&self, headers: &HeaderMap) -> Option<u64> {
        let header = headers.get("authorization")?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ")?;
        self.lock().tokens.get(token).copied()
    }

    fn authed(&self, headers: &HeaderMap) -> Result<u64, Response> {
        self.viewer(headers).ok_or_else(|| {
            error(
                StatusCode::UNAUTHORIZED,
                "Given token not valid for any token type",
            )
        })
    }

    fn render_user(state: &MockState, id: u64, viewer: Option<u64>) -> Value {
        let mut user = state.users[&id].clone();
        let following = viewer
            .map(|v| state.follows.contains(&(v, id)))
            .unwrap_or(false);
        user["is_following"] = json!(following);
        user
    }

    fn follow_counts(state: &MockState, id: u64) -> (usize, usize) {
        let followers = state.follows.iter().filter(|(_, to)| *to == id).count();
        let following = state.follows.iter().filter(|(from, _)| *from == id).count();
        (followers, following)
    }

    fn render_post(state: &MockState, post: &Value, viewer: Option<u64>) -> Value {
        let mut post = post.clone();
        let id = post["id"].as_u64().unwrap();
        let author = post["user"]["id"].as_u64().unwrap();
        let likers = state.likes.get(&id);
        post["user"] = Self::render_user(state, author, viewer);
        post["likes_count"] = json!(likers.map(|l| l.len()).unwrap_or(0));
        post["is_liked"] = json!(viewer
            .map(|v| likers.map(|l| l.contains(&v)).unwrap_or(false))
            .unwrap_or(false));
        post["comments_count"] = json!(state
            .comments
            .iter()
            .filter(|c| c["post"].as_u64() == Some(id))
            .count());
        post
    }

    fn posts_where(&self, viewer: Option<u64>, keep: impl Fn(&Value) -> bool) -> Vec<Value> {
        let state = self.lock();
        state
            .posts
            .iter()
            .filter(|p| keep(p))
            .map(|p| Self::render_post(&state, p, viewer))
            .collect()
    }
}

async fn record(State(api): State<MockApi>, request: Request, next: Next) -> Response {
    let bearer = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    api.lock().requests.push(Recorded {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        bearer,
    });
    next.run(request).await
}

// -- auth --

async fn login(State(api): State<MockApi>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let mut state = api.lock();
    match state.passwords.get(username).cloned() {
        Some((expected, id)) if expected == password => {
            let (access, refresh) = if id == NOVA_ID {
                (NOVA_ACCESS.to_string(), NOVA_REFRESH.to_string())
            } else {
                (format!("access-{}", id), format!("refresh-{}", id))
            };
            state.tokens.insert(access.clone(), id);
            Json(json!({ "access": access, "refresh": refresh })).into_response()
        }
        _ => error(
            StatusCode::UNAUTHORIZED,
            "No active account found with the given credentials",
        ),
    }
}

async fn register(State(api): State<MockApi>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();

    let mut state = api.lock();
    if state.passwords.contains_key(&username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "username": ["A user with that username already exists."],
                "email": ["user with this email already exists."]
            })),
        )
            .into_response();
    }
    if password.len() < 8 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "password": ["This password is too short."] })),
        )
            .into_response();
    }

    state.next_id += 1;
    let id = state.next_id;
    state.users.insert(id, user_json(id, &username));
    state.passwords.insert(username, (password, id));
    let access = format!("access-{}", id);
    state.tokens.insert(access.clone(), id);
    (
        StatusCode::CREATED,
        Json(json!({ "access": access, "refresh": format!("refresh-{}", id) })),
    )
        .into_response()
}

async fn own_profile(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    match api.authed(&headers) {
        Ok(id) => Json(api.lock().users[&id].clone()).into_response(),
        Err(response) => response,
    }
}

async fn update_profile(
    State(api): State<MockApi>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let id = match api.authed(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap();
        match file_name {
            Some(file_name) => fields.push((name, format!("/media/{}", file_name), true)),
            None => fields.push((name, String::from_utf8_lossy(&bytes).into_owned(), false)),
        }
    }

    let mut state = api.lock();
    if fields.iter().any(|(name, value, _)| name == "email" && !value.contains('@')) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "email": ["Enter a valid email address."] })),
        )
            .into_response();
    }
    for (name, value, is_file) in fields {
        if is_file {
            state.uploads.push((name.clone(), value.clone()));
        }
        state.users.get_mut(&id).unwrap()[name.as_str()] = json!(value);
    }
    Json(state.users[&id].clone()).into_response()
}

async fn user_profile(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if let Err(response) = api.authed(&headers) {
        return response;
    }
    let state = api.lock();
    if !state.users.contains_key(&id) {
        return error(StatusCode::NOT_FOUND, "Not found.");
    }
    let (followers, following) = MockApi::follow_counts(&state, id);
    // Serialized without the viewer: `is_following` is always false.
    Json(json!({
        "user": state.users[&id].clone(),
        "profile": { "followers_count": followers, "following_count": following }
    }))
    .into_response()
}

async fn user_stats(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if let Err(response) = api.authed(&headers) {
        return response;
    }
    let state = api.lock();
    if !state.users.contains_key(&id) {
        return error(StatusCode::NOT_FOUND, "User not found");
    }
    let (followers, following) = MockApi::follow_counts(&state, id);
    Json(json!({ "followers": followers, "following": following })).into_response()
}

async fn toggle_follow(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    let viewer = match api.authed(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if viewer == id {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "You cannot follow yourself" })),
        )
            .into_response();
    }
    let mut state = api.lock();
    let status = if state.follows.remove(&(viewer, id)) {
        "unfollowed"
    } else {
        state.follows.insert((viewer, id));
        "followed"
    };
    Json(json!({ "status": status })).into_response()
}

async fn followers(State(api): State<MockApi>, Path(id): Path<u64>) -> Response {
    let state = api.lock();
    let users: Vec<Value> = state
        .follows
        .iter()
        .filter(|(_, to)| *to == id)
        .map(|(from, _)| state.users[from].clone())
        .collect();
    Json(json!({ "followers": users })).into_response()
}

async fn following(State(api): State<MockApi>, Path(id): Path<u64>) -> Response {
    let state = api.lock();
    let users: Vec<Value> = state
        .follows
        .iter()
        .filter(|(from, _)| *from == id)
        .map(|(_, to)| state.users[to].clone())
        .collect();
    Json(json!({ "following": users })).into_response()
}

async fn resolve_user(State(api): State<MockApi>, Path(username): Path<String>) -> Response {
    match api.lock().passwords.get(&username) {
        Some((_, id)) => Json(json!({ "id": id })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        )
            .into_response(),
    }
}

// -- posts --

async fn list_posts(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    if api.lock().posts_fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "<h1>Server Error (500)</h1>").into_response();
    }
    let viewer = api.viewer(&headers);
    Json(api.posts_where(viewer, |_| true)).into_response()
}

async fn explore_posts(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    let mode = api.lock().explore;
    match mode {
        ExploreMode::List => {
            let results = api.posts_where(api.viewer(&headers), |_| true);
            Json(json!({ "count": results.len(), "next": null, "results": results }))
                .into_response()
        }
        ExploreMode::NotAList => Json(json!({ "message": "explore is warming up" })).into_response(),
        ExploreMode::Fail => error(StatusCode::SERVICE_UNAVAILABLE, "Explore unavailable"),
    }
}

async fn user_posts(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    let viewer = api.viewer(&headers);
    let results = api.posts_where(viewer, |p| p["user"]["id"].as_u64() == Some(id));
    Json(json!({ "count": results.len(), "next": null, "results": results })).into_response()
}

async fn create_post(
    State(api): State<MockApi>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let viewer = match api.authed(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut caption = String::new();
    let mut image = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap();
        match name.as_str() {
            "caption" => caption = String::from_utf8_lossy(&bytes).into_owned(),
            "image" => image = file_name.map(|f| format!("/media/posts/{}", f)),
            _ => {}
        }
    }

    let mut state = api.lock();
    if let Some(ref image) = image {
        state.uploads.push(("image".to_string(), image.clone()));
    }
    state.next_id += 1;
    let id = state.next_id;
    let post = json!({
        "id": id,
        "user": state.users[&viewer].clone(),
        "caption": caption,
        "image": image,
        "created_at": "2024-03-03T08:00:00Z",
        "updated_at": "2024-03-03T08:00:00Z",
        "likes_count": 0,
        "comments_count": 0,
        "is_liked": false
    });
    state.posts.insert(0, post.clone());
    (StatusCode::CREATED, Json(post)).into_response()
}

async fn get_post(State(api): State<MockApi>, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    let viewer = api.viewer(&headers);
    match api.posts_where(viewer, |p| p["id"].as_u64() == Some(id)).pop() {
        Some(post) => Json(post).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not found."),
    }
}

async fn edit_post(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    let viewer = match api.authed(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut state = api.lock();
    let Some(index) = state.posts.iter().position(|p| p["id"].as_u64() == Some(id)) else {
        return error(StatusCode::NOT_FOUND, "Not found.");
    };
    if state.posts[index]["user"]["id"].as_u64() != Some(viewer) {
        return error(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action.",
        );
    }
    state.posts[index]["caption"] = body["caption"].clone();
    state.posts[index]["updated_at"] = json!("2024-03-04T09:00:00Z");
    let post = state.posts[index].clone();
    Json(MockApi::render_post(&state, &post, Some(viewer))).into_response()
}

async fn delete_post(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    let viewer = match api.authed(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut state = api.lock();
    let before = state.posts.len();
    state
        .posts
        .retain(|p| !(p["id"].as_u64() == Some(id) && p["user"]["id"].as_u64() == Some(viewer)));
    if state.posts.len() == before {
        return error(StatusCode::NOT_FOUND, "Not found.");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn toggle_like(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    let viewer = match api.authed(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut state = api.lock();
    let likers = state.likes.entry(id).or_default();
    let liked = if likers.remove(&viewer) {
        false
    } else {
        likers.insert(viewer);
        true
    };
    Json(json!({ "liked": liked })).into_response()
}

// -- comments --

async fn list_comments(State(api): State<MockApi>, Path(id): Path<u64>) -> Response {
    let comments: Vec<Value> = api
        .lock()
        .comments
        .iter()
        .filter(|c| c["post"].as_u64() == Some(id))
        .cloned()
        .collect();
    Json(comments).into_response()
}

async fn create_comment(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    let viewer = match api.authed(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let content = body["content"].as_str().unwrap_or_default();
    if content.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "content": ["This field may not be blank."] })),
        )
            .into_response();
    }
    let mut state = api.lock();
    state.next_id += 1;
    let comment = json!({
        "id": state.next_id,
        "post": id,
        "user": state.users[&viewer].clone(),
        "content": content,
        "created_at": "2024-03-03T09:00:00Z",
        "updated_at": "2024-03-03T09:00:00Z"
    });
    state.comments.push(comment.clone());
    (StatusCode::CREATED, Json(comment)).into_response()
}

async fn edit_comment(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    let viewer = match api.authed(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut state = api.lock();
    let Some(comment) = state
        .comments
        .iter_mut()
        .find(|c| c["id"].as_u64() == Some(id) && c["user"]["id"].as_u64() == Some(viewer))
    else {
        return error(StatusCode::NOT_FOUND, "Not found.");
    };
    comment["content"] = body["content"].clone();
    Json(comment.clone()).into_response()
}

async fn delete_comment(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    let viewer = match api.authed(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut state = api.lock();
    let before = state.comments.len();
    state
        .comments
        .retain(|c| !(c["id"].as_u64() == Some(id) && c["user"]["id"].as_u64() == Some(viewer)));
    if state.comments.len() == before {
        return error(StatusCode::NOT_FOUND, "Not found.");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn predict_comment(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = api.authed(&headers) {
        return response;
    }
    let text = body["comment"].as_str().unwrap_or_default().to_lowercase();
    let labels: Vec<&str> = if api.lock().toxic_words.iter().any(|w| text.contains(w)) {
        vec!["toxic", "insult"]
    } else {
        vec![]
    };
    Json(json!({ "labels": labels })).into_response()
}

fn router(api: MockApi) -> Router {
    let routes = Router::new()
        .route("/auth/login/", post(login))
        .route("/auth/register/", post(register))
        .route("/auth/user/profile/", get(own_profile).put(update_profile))
        .route("/auth/profile/{id}/", get(user_profile))
        .route("/auth/follow/{id}/", post(toggle_follow))
        .route("/auth/user/{id}/stats/", get(user_stats))
        .route("/auth/followers/{id}/", get(followers))
        .route("/auth/following/{id}/", get(following))
        .route("/auth/resolve-user/{username}/", get(resolve_user))
        .route("/posts/", get(list_posts).post(create_post))
        .route("/posts/explore/", get(explore_posts))
        .route("/posts/user/{id}/", get(user_posts))
        .route("/posts/{id}/", get(get_post).put(edit_post).delete(delete_post))
        .route("/posts/{id}/like/", post(toggle_like))
        .route("/posts/{id}/comments/", get(list_comments).post(create_comment))
        .route("/comments/{id}/", put(edit_comment).delete(delete_comment))
        .route("/predict-comment/", post(predict_comment));

    Router::new()
        .nest("/api", routes)
        .layer(middleware::from_fn_with_state(api.clone(), record))
        .with_state(api)
}

/// A running mock server. Shuts down when dropped.
pub struct MockServer {
    /// API base, e.g. `http://127.0.0.1:34567/api`
    pub base_url: String,
    pub api: MockApi,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockServer {
    pub async fn spawn() -> Self {
        let api = MockApi::new();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let app = router(api.clone());
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}/api", port),
            api,
            _shutdown_tx: Some(shutdown_tx),
        }
    }
}
