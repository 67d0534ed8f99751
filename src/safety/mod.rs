//! Comment safety gate: a per-draft verdict from the toxicity endpoint.

mod gate;
mod verdict;

pub use gate::{CommentDraft, DraftStatus};
pub use verdict::{DraftState, Verdict};

/// Shown when a submission is refused because the draft was flagged.
pub const UNSAFE_COMMENT: &str = "This comment may be unsafe. Please revise it.";
