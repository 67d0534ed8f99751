use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::models::UserId;

/// One follow control. The busy flag is scoped to the button: two buttons
/// for the same user do not block each other.
#[derive(Debug)]
pub struct FollowButton {
    user_id: UserId,
    following: AtomicBool,
    busy: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A request from this button was already in flight.
    Ignored,
    /// The server acknowledged; carries the new following state.
    Toggled(bool),
}

impl FollowButton {
    pub fn new(user_id: UserId, following: bool) -> Self {
        Self {
            user_id,
            following: AtomicBool::new(following),
            busy: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_following(&self) -> bool {
        self.following.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn label(&self) -> &'static str {
        match (self.is_busy(), self.is_following()) {
            (true, _) => "...",
            (false, true) => "Unfollow",
            (false, false) => "Follow",
        }
    }

    pub(crate) fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard { button: self })
    }

    pub(crate) fn settle(&self, following: bool) {
        self.following.store(following, Ordering::SeqCst);
    }

    /// Adopt the store's follow state unless a request is in flight.
    pub(crate) fn sync(&self, following: bool) {
        if !self.is_busy() {
            self.settle(following);
        }
    }
}

/// Clears the busy flag when the request finishes, however it finishes.
pub(crate) struct BusyGuard<'a> {
    button: &'a FollowButton,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.button.busy.store(false, Ordering::SeqCst);
    }
}
