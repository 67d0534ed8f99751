//! Normalized entity store shared by every view.
//!
//! Posts and users are kept once, keyed by id. Views hold ordered id slices
//! and read through the store, so a like in the home feed is visible in the
//! profile grid without either view refetching.
//!
//! Fetches are reconciled with local interactions through [`FetchTicket`]s:
//! a fetch records the store revision when it starts, and ingesting its
//! results leaves the interaction fields of any entity mutated locally after
//! that point untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::api::models::{Post, PostId, User, UserId};

/// Store revision observed when a fetch was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn revision(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    /// Revision of the last local mutation, 0 if never touched.
    touched: u64,
}

impl<T> Entry<T> {
    fn fresh(value: T) -> Self {
        Self { value, touched: 0 }
    }

    fn touched_after(&self, ticket: FetchTicket) -> bool {
        self.touched > ticket.0
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    revision: u64,
    posts: HashMap<PostId, Entry<Post>>,
    users: HashMap<UserId, Entry<User>>,
}

impl StoreInner {
    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn merge_user(&mut self, ticket: FetchTicket, mut user: User) -> User {
        let touched = match self.users.get(&user.id) {
            Some(existing) => {
                if existing.touched_after(ticket) {
                    user.is_following = existing.value.is_following;
                }
                existing.touched
            }
            None => 0,
        };
        self.users.insert(
            user.id,
            Entry {
                value: user.clone(),
                touched,
            },
        );
        user
    }

    fn merge_post(&mut self, ticket: FetchTicket, mut post: Post) {
        let touched = match self.posts.get(&post.id) {
            Some(existing) => {
                if existing.touched_after(ticket) {
                    post.is_liked = existing.value.is_liked;
                    post.likes_count = existing.value.likes_count;
                }
                existing.touched
            }
            None => 0,
        };

        if let Some(author) = self.users.get(&post.user.id) {
            if author.touched_after(ticket) {
                post.user.is_following = author.value.is_following;
            }
        }

        self.posts.insert(post.id, Entry { value: post, touched });
    }
}

/// Cheap-to-clone handle on the shared store.
#[derive(Clone)]
pub struct EntityStore {
    inner: Arc<Mutex<StoreInner>>,
    changes: watch::Sender<u64>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            changes,
        }
    }

    fn inner(&self) -> MutexGuard<'_, StoreInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, revision: u64) {
        self.changes.send_replace(revision);
    }

    pub fn revision(&self) -> u64 {
        self.inner().revision
    }

    /// Observe store revisions. Every write publishes a new value.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket(self.revision())
    }

    /// Merge fetched posts and their authors, returning the ids in server
    /// order for the caller's slice.
    pub fn ingest_posts(&self, ticket: FetchTicket, posts: Vec<Post>) -> Vec<PostId> {
        let mut inner = self.inner();
        let mut ids = Vec::with_capacity(posts.len());
        for post in posts {
            ids.push(post.id);
            inner.merge_user(ticket, post.user.clone());
            inner.merge_post(ticket, post);
        }
        let revision = inner.bump();
        drop(inner);

        self.publish(revision);
        ids
    }

    pub fn ingest_user(&self, ticket: FetchTicket, user: User) -> User {
        let mut inner = self.inner();
        let merged = inner.merge_user(ticket, user);
        let revision = inner.bump();
        drop(inner);

        self.publish(revision);
        merged
    }

    /// Merge a user from the profile endpoint, which always reports
    /// `is_following` as false. The follow state already known from posts
    /// or a confirmed toggle is kept.
    pub fn ingest_profile_user(&self, ticket: FetchTicket, mut user: User) -> User {
        let mut inner = self.inner();
        if let Some(existing) = inner.users.get(&user.id) {
            user.is_following = existing.value.is_following;
        }
        let merged = inner.merge_user(ticket, user);
        let revision = inner.bump();
        drop(inner);

        self.publish(revision);
        merged
    }

    pub fn post(&self, id: PostId) -> Option<Post> {
        self.inner().posts.get(&id).map(|e| e.value.clone())
    }

    /// Resolve a slice of ids; ids no longer in the store are skipped.
    pub fn posts(&self, ids: &[PostId]) -> Vec<Post> {
        let inner = self.inner();
        ids.iter()
            .filter_map(|id| inner.posts.get(id).map(|e| e.value.clone()))
            .collect()
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.inner().users.get(&id).map(|e| e.value.clone())
    }

    /// Apply a local mutation to a post. Returns the updated post, or `None`
    /// if the store does not know it.
    pub fn update_post(&self, id: PostId, apply: impl FnOnce(&mut Post)) -> Option<Post> {
        let mut inner = self.inner();
        if !inner.posts.contains_key(&id) {
            return None;
        }
        let revision = inner.bump();
        let entry = inner.posts.get_mut(&id)?;
        apply(&mut entry.value);
        entry.touched = revision;
        let updated = entry.value.clone();
        drop(inner);

        self.publish(revision);
        Some(updated)
    }

    /// Store a post created by this client.
    pub fn insert_post(&self, post: Post) {
        let mut inner = self.inner();
        let revision = inner.bump();
        let author = post.user.clone();
        if !inner.users.contains_key(&author.id) {
            inner.users.insert(author.id, Entry::fresh(author));
        }
        inner.posts.insert(
            post.id,
            Entry {
                value: post,
                touched: revision,
            },
        );
        drop(inner);

        self.publish(revision);
    }

    pub fn remove_post(&self, id: PostId) -> Option<Post> {
        let mut inner = self.inner();
        let removed = inner.posts.remove(&id).map(|e| e.value);
        let revision = inner.bump();
        drop(inner);

        self.publish(revision);
        removed
    }

    /// Record a confirmed follow change on the user and every post they
    /// authored.
    pub fn set_following(&self, user_id: UserId, following: bool) {
        let mut inner = self.inner();
        let revision = inner.bump();

        if let Some(entry) = inner.users.get_mut(&user_id) {
            entry.value.is_following = following;
            entry.touched = revision;
        }
        for entry in inner.posts.values_mut() {
            if entry.value.user.id == user_id {
                entry.value.user.is_following = following;
            }
        }
        drop(inner);

        self.publish(revision);
    }
}
