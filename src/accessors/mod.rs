//! Resource accessors.
//!
//! Typed operations over the four resource families the pipelines touch:
//! issue comments, check runs, workflow dispatches and search. Each one
//! builds [`GitHubEffect`]s, hands them to a [`GitHubInterpreter`] and
//! unpacks the response. None of them keeps state between calls.

pub mod check_runs;
pub mod comments;
pub mod pulls;
pub mod search;
pub mod workflows;

pub use check_runs::{fail_check_run, list_check_runs, queue_check_run, update_check_run};
pub use comments::{add_reaction, append_to_comment, create_comment, get_comment, list_comments};
pub use pulls::{collaborator_permission, get_pull_request};
pub use search::search_issues;
pub use workflows::{DispatchPolling, DispatchResult, dispatch_workflow, workflow_run_exists};

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::error::PipelineError;

/// Runs one effect, converting the interpreter's error.
pub(crate) async fn interpret<G: GitHubInterpreter>(
    github: &G,
    effect: GitHubEffect,
) -> Result<GitHubResponse, PipelineError> {
    github
        .interpret(effect)
        .await
        .map_err(|e| PipelineError::GitHub(e.into()))
}

pub(crate) fn unexpected(effect: &'static str, response: &GitHubResponse) -> PipelineError {
    PipelineError::UnexpectedResponse {
        effect,
        got: response.kind(),
    }
}
