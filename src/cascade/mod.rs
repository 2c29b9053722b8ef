//! Cascade Controller.
//!
//! Drives the pipelines that chain GitHub Actions workflows together:
//!
//! - **Tag → artifacts**: `/git-artifacts` tags the PR head with `tag-git`,
//!   and a successful `tag-git` check run fans out into one
//!   `git-artifacts-<arch>` run per architecture ([`artifacts`],
//!   [`check_run`]).
//! - **Release**: `/release` and the embargoed variants correlate the
//!   finished stages and start the release workflow ([`release`]).
//! - **Deploy**: `/deploy` fans a package build out over its architectures
//!   ([`deploy`]).
//!
//! # Key Invariants
//!
//! 1. **Placeholders are never left queued**: every check run the controller
//!    queues is either handed to a dispatched workflow or marked as failed
//!    with the error that stopped it.
//!
//! 2. **Targets are isolated**: one architecture failing to dispatch does not
//!    stop the others. Every target is reported, and the invocation fails
//!    afterwards.
//!
//! 3. **Reports are appended**: progress goes into the tracking comment as a
//!    new section. Nothing already in the comment is rewritten.

pub mod artifacts;
pub mod check_run;
pub mod deploy;
pub mod release;

pub use artifacts::{ARCHITECTURES, GitArtifactsRequest, request_git_artifacts, trigger_artifacts_runs};
pub use check_run::handle_completed_check_run;
pub use deploy::{DeployRequest, deploy};
pub use release::release;

use tracing::warn;

use crate::accessors::{DispatchResult, append_to_comment, dispatch_workflow, fail_check_run};
use crate::config::BotConfig;
use crate::effects::{CommentData, GitHubInterpreter, WorkflowInputs};
use crate::error::PipelineError;
use crate::types::{CommentId, RepoId, StageRecord};

/// Workflow files in the automation repository.
pub mod workflows {
    pub const TAG_GIT: &str = "tag-git.yml";
    pub const GIT_ARTIFACTS: &str = "git-artifacts.yml";
    pub const RELEASE_GIT: &str = "release-git.yml";
    pub const PREPARE_EMBARGOED_RELEASE: &str = "prepare-embargoed-release.yml";
    pub const PUBLISH_EMBARGOED_RELEASE: &str = "publish-embargoed-release.yml";
    pub const BUILD_AND_DEPLOY: &str = "build-and-deploy.yml";
    pub const OPEN_PR: &str = "open-pr.yml";
    pub const UPDPKGSUMS: &str = "updpkgsums.yml";
    /// Lives in `build-extra`, not in the automation repository.
    pub const ADD_RELEASE_NOTE: &str = "add-release-note.yml";
}

/// The comment a pipeline reports its progress into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingComment {
    pub repo: RepoId,
    pub id: CommentId,
}

impl TrackingComment {
    pub fn new(repo: RepoId, id: CommentId) -> Self {
        TrackingComment { repo, id }
    }

    /// Appends `section`, re-reading the body first.
    pub async fn append<G: GitHubInterpreter>(
        &self,
        github: &G,
        section: &str,
    ) -> Result<CommentData, PipelineError> {
        append_to_comment(github, &self.repo, self.id, section).await
    }
}

/// The outcome of a fan-out over several targets.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// One line per target, in target order.
    pub report: String,
    /// Errors of the targets that could not be started.
    pub failures: Vec<PipelineError>,
}

impl FanOutReport {
    /// A report with a single section and nothing failed.
    pub fn section(report: impl Into<String>) -> Self {
        FanOutReport {
            report: report.into(),
            failures: Vec::new(),
        }
    }

    /// Fails with the first target error, if any.
    pub fn finish(self) -> Result<String, PipelineError> {
        let mut failures = self.failures.into_iter();
        match failures.next() {
            None => Ok(self.report),
            Some(first) => {
                for other in failures {
                    warn!(error = %other, "additional fan-out target failed");
                }
                Err(first)
            }
        }
    }
}

/// Builds workflow inputs from key/value pairs.
pub(crate) fn workflow_inputs<const N: usize>(
    pairs: [(&str, serde_json::Value); N],
) -> WorkflowInputs {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Dispatches a workflow of the automation repository.
pub(crate) async fn dispatch_automation<G: GitHubInterpreter>(
    github: &G,
    config: &BotConfig,
    workflow: &str,
    inputs: WorkflowInputs,
) -> Result<DispatchResult, PipelineError> {
    dispatch_workflow(
        github,
        &config.automation(),
        workflow,
        &config.automation_ref,
        inputs,
        config.dispatch_polling,
    )
    .await
}

/// Marks `placeholder` as failed when `result` is an error.
///
/// The original error is returned either way; a failure to update the check
/// run is only logged.
pub(crate) async fn guard_placeholder<G: GitHubInterpreter, T>(
    github: &G,
    repo: &RepoId,
    placeholder: &StageRecord,
    result: Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    if let Err(e) = &result {
        warn!(
            %repo,
            stage = %placeholder.name,
            check_run_id = %placeholder.id,
            error = %e,
            "pipeline failed; marking check run as failed"
        );
        if let Err(update_error) = fail_check_run(
            github,
            repo,
            placeholder.id,
            placeholder.output.title(),
            placeholder.output.summary(),
            &e.to_string(),
        )
        .await
        {
            warn!(
                check_run_id = %placeholder.id,
                error = %update_error,
                "could not mark check run as failed"
            );
        }
    }
    result
}
