//! Core domain types for the helper bot.
//!
//! Every value here is a transient view over a GitHub resource, re-fetched
//! for each event.

pub mod ids;
pub mod stage;
pub mod target;

pub use ids::{CheckRunId, CommentId, InstallationId, IssueNumber, RepoId, Sha, WorkflowRunId};
pub use stage::{CheckRunStatus, Conclusion, StageOutput, StageRecord, StageState, names};
pub use target::{ArchitectureTarget, PackageKind, needs_separate_arm64_build};
