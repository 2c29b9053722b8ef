//! Effects-as-data for GitHub operations.
//!
//! Pipelines never call the GitHub API directly. They build [`GitHubEffect`]
//! values and hand them to a [`GitHubInterpreter`]. This enables:
//! - Testability via mock interpreters that record every effect
//! - Logging/tracing of intended operations
//! - Retry in one place (the octocrab interpreter)

pub mod github;
pub mod interpreter;

pub use github::{
    CheckRunUpdate, CommentData, GitHubEffect, GitHubResponse, NewCheckRun, Permission,
    PullRequestData, Reaction, SearchHit, TextMatch, WorkflowInputs, WorkflowRunData,
};
pub use interpreter::GitHubInterpreter;
