//! Release pipelines.
//!
//! `/release` and `/prepare-embargoed-release` publish the artifacts built
//! by the `git-artifacts-<arch>` runs of the PR head; both architectures must
//! have succeeded and must agree on version and tag run.
//! `/publish-embargoed-release` publishes an already prepared embargoed
//! release and only needs the version `tag-git` tagged.

use tracing::info;

use crate::accessors::{queue_check_run, update_check_run};
use crate::config::BotConfig;
use crate::correlate::{correlate_artifacts, tagged_version};
use crate::effects::{CheckRunUpdate, GitHubInterpreter, WorkflowInputs};
use crate::error::PipelineError;
use crate::types::{RepoId, Sha, StageOutput, names};
use crate::wire::format::{self, ReleaseKind};

use super::{ARCHITECTURES, dispatch_automation, guard_placeholder, workflow_inputs, workflows};

struct ReleaseStage {
    check_run: &'static str,
    workflow: &'static str,
    /// How the workflow is named in the tracking comment.
    label: &'static str,
}

fn stage(kind: ReleaseKind) -> ReleaseStage {
    match kind {
        ReleaseKind::Publish => ReleaseStage {
            check_run: names::GITHUB_RELEASE,
            workflow: workflows::RELEASE_GIT,
            label: "release-git",
        },
        ReleaseKind::PrepareEmbargoed => ReleaseStage {
            check_run: names::PREPARE_GITHUB_RELEASE,
            workflow: workflows::PREPARE_EMBARGOED_RELEASE,
            label: "prepare-embargoed-release",
        },
        ReleaseKind::PublishEmbargoed => ReleaseStage {
            check_run: names::GITHUB_RELEASE,
            workflow: workflows::PUBLISH_EMBARGOED_RELEASE,
            label: "publish-embargoed-release",
        },
    }
}

/// Runs a release pipeline for `commit`. Returns the section for the
/// tracking comment.
///
/// The placeholder check run is queued before anything is correlated, so a
/// correlation failure shows up on the commit as a failed release.
pub async fn release<G: GitHubInterpreter>(
    github: &G,
    config: &BotConfig,
    repo: &RepoId,
    commit: &Sha,
    kind: ReleaseKind,
) -> Result<String, PipelineError> {
    let stage = stage(kind);
    let placeholder = queue_check_run(
        github,
        repo,
        stage.check_run,
        commit,
        StageOutput::new(kind.initial_title(commit), kind.initial_summary(repo)),
    )
    .await?;

    let result = async {
        let (output, inputs) = release_inputs(github, config, repo, commit, kind).await?;
        update_check_run(github, repo, placeholder.id, CheckRunUpdate::output(output)).await?;

        let run = dispatch_automation(github, config, stage.workflow, inputs).await?;
        info!(%repo, %commit, workflow = stage.workflow, url = %run.html_url, "release workflow started");
        update_check_run(
            github,
            repo,
            placeholder.id,
            CheckRunUpdate::details_url(&run.html_url),
        )
        .await?;
        Ok::<_, PipelineError>(format::named_workflow_started(stage.label, &run.html_url))
    }
    .await;

    guard_placeholder(github, repo, &placeholder, result).await
}

/// The versioned check-run output and the workflow inputs.
async fn release_inputs<G: GitHubInterpreter>(
    github: &G,
    config: &BotConfig,
    repo: &RepoId,
    commit: &Sha,
    kind: ReleaseKind,
) -> Result<(StageOutput, WorkflowInputs), PipelineError> {
    if kind == ReleaseKind::PublishEmbargoed {
        let version = tagged_version(github, repo, commit).await?;
        let output = StageOutput::new(
            kind.versioned_title(&version, commit),
            kind.initial_summary(repo),
        );
        return Ok((output, workflow_inputs([("git-version", version.into())])));
    }

    let correlation =
        correlate_artifacts(github, repo, commit, &ARCHITECTURES, &config.automation()).await?;
    let run = |architecture: &str| {
        correlation
            .run(architecture)
            .ok_or_else(|| PipelineError::StageNotFound(names::git_artifacts(architecture)))
    };
    let (x86_64, i686) = (run("x86_64")?, run("i686")?);

    let output = StageOutput::new(
        kind.versioned_title(&correlation.version, commit),
        kind.artifacts_summary(x86_64, i686, repo),
    );
    let inputs = workflow_inputs([
        ("git_artifacts_x86_64_workflow_run_id", x86_64.0.into()),
        ("git_artifacts_i686_workflow_run_id", i686.0.into()),
    ]);
    Ok((output, inputs))
}
