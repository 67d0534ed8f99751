use serde::Serialize;

use crate::api::models::SafetyReport;
use crate::error::ClientResult;

/// Safety classification of a comment draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The check failed or could not be made. Not blocking.
    Unknown,
    Safe,
    Unsafe,
}

impl Verdict {
    pub fn from_labels(labels: &[String]) -> Self {
        if labels.is_empty() {
            Verdict::Safe
        } else {
            Verdict::Unsafe
        }
    }

    pub fn from_check(result: ClientResult<SafetyReport>) -> Self {
        match result {
            Ok(report) => Self::from_labels(&report.labels),
            Err(e) => {
                tracing::warn!("Comment safety check unavailable: {}", e);
                Verdict::Unknown
            }
        }
    }

    pub fn blocks_submission(&self) -> bool {
        matches!(self, Verdict::Unsafe)
    }
}

/// Draft lifecycle: `Empty -> Checking -> Settled(..)`, back to `Checking`
/// on every non-empty edit and to `Empty` whenever the text is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "verdict", rename_all = "snake_case")]
pub enum DraftState {
    Empty,
    Checking,
    Settled(Verdict),
}

impl DraftState {
    /// State after the draft text becomes `text`.
    pub fn on_edit(text: &str) -> Self {
        if text.trim().is_empty() {
            DraftState::Empty
        } else {
            DraftState::Checking
        }
    }

    /// A check of the current text finished. An emptied draft ignores it.
    pub fn resolve(self, verdict: Verdict) -> Self {
        match self {
            DraftState::Empty => DraftState::Empty,
            _ => DraftState::Settled(verdict),
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            DraftState::Settled(v) => Some(*v),
            _ => None,
        }
    }

    /// Only a settled `Unsafe` verdict blocks.
    pub fn can_submit(&self) -> bool {
        !matches!(self, DraftState::Settled(Verdict::Unsafe))
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            DraftState::Empty => "empty",
            DraftState::Checking => "checking",
            DraftState::Settled(Verdict::Unknown) => "unknown",
            DraftState::Settled(Verdict::Safe) => "safe",
            DraftState::Settled(Verdict::Unsafe) => "unsafe",
        }
    }
}
