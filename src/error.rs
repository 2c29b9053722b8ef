//! Errors raised by pipelines.
//!
//! Ineligible contexts are not errors; the router answers them with an
//! "Ignoring ..." status line instead.

use thiserror::Error;

use crate::github::GitHubApiError;
use crate::types::{RepoId, WorkflowRunId};
use crate::wire::ParseError;

/// Errors that can abort a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The commenter lacks write access.
    #[error("@{0} has no permissions to do that")]
    PermissionDenied(String),

    /// More than one candidate where exactly one was expected.
    #[error("{0}")]
    Ambiguous(String),

    /// Stages of one cascade contradict each other.
    #[error("{0}")]
    UpstreamInconsistency(String),

    /// `The '<name>' run was not found`
    #[error("The '{0}' run was not found")]
    StageNotFound(String),

    /// `The '<name>' run at <url> did not succeed.`
    #[error("The '{name}' run at {url} did not succeed.")]
    StageNotSuccessful { name: String, url: String },

    /// The workflow run behind a successful stage was deleted.
    #[error("The '{name}' run links to {url}, which no longer exists")]
    RunDeleted { name: String, url: String },

    /// A run link in stage output points at the wrong repository.
    #[error("Unexpected repository {repo} for {stage} run {run_id}: {url}")]
    UnexpectedRepository {
        repo: RepoId,
        stage: String,
        run_id: WorkflowRunId,
        url: String,
    },

    /// Release notes cannot be added before every deployment has finished.
    #[error("The following deployment(s) are missing: {}", .0.join(", "))]
    MissingDeployments(Vec<String>),

    /// The package or version could not be derived from the issue.
    #[error("{0}")]
    Heuristics(String),

    /// Stage output does not follow the expected template.
    #[error("{context}: {source}")]
    Malformed {
        context: String,
        #[source]
        source: ParseError,
    },

    /// A dispatched workflow run never became visible.
    #[error("no `{workflow}` run showed up in {repo} after {attempts} lookups")]
    Dispatch {
        repo: RepoId,
        workflow: String,
        attempts: u32,
    },

    /// A response of the wrong shape came back from the interpreter.
    #[error("unexpected response to {effect}: got {got}")]
    UnexpectedResponse {
        effect: &'static str,
        got: &'static str,
    },

    #[error(transparent)]
    GitHub(#[from] GitHubApiError),
}

impl PipelineError {
    pub fn malformed(context: impl Into<String>, source: ParseError) -> Self {
        PipelineError::Malformed {
            context: context.into(),
            source,
        }
    }

    /// Whether this is the user-facing permission failure.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, PipelineError::PermissionDenied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_stage() {
        assert_eq!(
            PipelineError::StageNotFound("git-artifacts-i686".to_string()).to_string(),
            "The 'git-artifacts-i686' run was not found"
        );
        assert_eq!(
            PipelineError::StageNotSuccessful {
                name: "tag-git".to_string(),
                url: "https://github.com/git-for-windows/git/runs/1".to_string(),
            }
            .to_string(),
            "The 'tag-git' run at https://github.com/git-for-windows/git/runs/1 did not succeed."
        );
        assert_eq!(
            PipelineError::PermissionDenied("octocat".to_string()).to_string(),
            "@octocat has no permissions to do that"
        );
    }

    #[test]
    fn github_errors_are_transparent() {
        let err: PipelineError = GitHubApiError::not_found("gone").into();
        assert_eq!(err.to_string(), "GitHub API error (HTTP 404): gone");
    }
}
