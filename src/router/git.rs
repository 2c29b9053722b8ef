//! Handlers for `git` PRs: `/git-artifacts` and the release commands.

use crate::cascade::{GitArtifactsRequest, request_git_artifacts};
use crate::components::ComponentHeuristics;
use crate::effects::GitHubInterpreter;
use crate::error::PipelineError;
use crate::wire::format::ReleaseKind;

use super::Invocation;

pub(super) async fn git_artifacts<G: GitHubInterpreter, H: ComponentHeuristics>(
    invocation: &Invocation<'_, G, H>,
    mingit_only: bool,
    release_date: Option<String>,
) -> Result<String, PipelineError> {
    invocation.require_write().await?;
    invocation.acknowledge().await?;

    let request = GitArtifactsRequest {
        pull: invocation.pull_request().await?,
        mingit_only,
        release_date,
    };
    let fan_out = request_git_artifacts(
        invocation.github,
        invocation.config,
        &invocation.event.repo,
        &request,
    )
    .await?;
    let status = invocation.report(&fan_out.report).await?;
    fan_out.finish()?;
    Ok(status)
}

pub(super) async fn release<G: GitHubInterpreter, H: ComponentHeuristics>(
    invocation: &Invocation<'_, G, H>,
    kind: ReleaseKind,
) -> Result<String, PipelineError> {
    invocation.require_write().await?;
    invocation.acknowledge().await?;

    let pull = invocation.pull_request().await?;
    let section = crate::cascade::release(
        invocation.github,
        invocation.config,
        &invocation.event.repo,
        &pull.head_sha,
        kind,
    )
    .await?;
    invocation.report(&section).await
}
