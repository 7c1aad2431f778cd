//! Domain logic - pure release rules independent of git operations

pub mod context;
pub mod tag;

pub use context::{CommitResult, FailedAt, ReleaseContext, ReleaseState};
pub use tag::{compute_next_tag, Tag};
