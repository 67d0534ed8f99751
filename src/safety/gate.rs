use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::verdict::{DraftState, Verdict};
use crate::api::SocialApi;

/// Draft state tagged with the edit that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftStatus {
    pub generation: u64,
    pub state: DraftState,
}

/// An in-progress comment and its safety verdict.
///
/// Each edit restarts a debounced check and cancels the previous one. A
/// check only lands if no edit happened since it was scheduled.
pub struct CommentDraft {
    api: Arc<dyn SocialApi>,
    debounce: Duration,
    text: String,
    status: Arc<watch::Sender<DraftStatus>>,
    pending: Option<JoinHandle<()>>,
}

impl CommentDraft {
    pub fn new(api: Arc<dyn SocialApi>, debounce: Duration) -> Self {
        let (status, _) = watch::channel(DraftStatus {
            generation: 0,
            state: DraftState::Empty,
        });
        Self {
            api,
            debounce,
            text: String::new(),
            status: Arc::new(status),
            pending: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> DraftState {
        self.status.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<DraftStatus> {
        self.status.subscribe()
    }

    /// Replace the draft text. Must be called inside a tokio runtime.
    pub fn edit(&mut self, text: impl Into<String>) -> DraftState {
        self.cancel_pending();
        self.text = text.into();

        let state = DraftState::on_edit(&self.text);
        let mut generation = 0;
        self.status.send_modify(|status| {
            status.generation += 1;
            status.state = state;
            generation = status.generation;
        });

        if state == DraftState::Checking {
            self.pending = Some(tokio::spawn(run_check(
                self.api.clone(),
                self.status.clone(),
                self.text.clone(),
                generation,
                self.debounce,
            )));
        }
        state
    }

    /// Wait until the current edit has a verdict (or the draft is empty).
    pub async fn settled(&self) -> DraftState {
        let mut rx = self.status.subscribe();
        let result = rx
            .wait_for(|status| status.state != DraftState::Checking)
            .await
            .map(|status| status.state);
        result.unwrap_or_else(|_| self.state())
    }

    /// Check the text as it stands right now, bypassing the debounce, and
    /// record the result. Used at submit time.
    pub async fn final_verdict(&mut self) -> Verdict {
        self.cancel_pending();
        let generation = self.status.borrow().generation;
        let verdict = Verdict::from_check(self.api.check_comment_safety(&self.text).await);
        apply(&self.status, generation, verdict);
        verdict
    }

    /// Drop the text and any verdict.
    pub fn clear(&mut self) {
        self.edit(String::new());
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for CommentDraft {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

async fn run_check(
    api: Arc<dyn SocialApi>,
    status: Arc<watch::Sender<DraftStatus>>,
    text: String,
    generation: u64,
    debounce: Duration,
) {
    tokio::time::sleep(debounce).await;
    let verdict = Verdict::from_check(api.check_comment_safety(&text).await);
    apply(&status, generation, verdict);
}

fn apply(status: &watch::Sender<DraftStatus>, generation: u64, verdict: Verdict) {
    let landed = status.send_if_modified(|current| {
        if current.generation != generation {
            return false;
        }
        let next = current.state.resolve(verdict);
        let changed = next != current.state;
        current.state = next;
        changed
    });
    if !landed {
        tracing::debug!("Dropped verdict for superseded draft {}", generation);
    }
}
