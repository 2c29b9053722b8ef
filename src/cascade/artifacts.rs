//! The tag → artifacts chain.
//!
//! `/git-artifacts` on a `git` PR either reuses a `tag-git` stage that
//! already succeeded for the PR head or dispatches a new one. Once `tag-git`
//! has succeeded, one `git-artifacts-<arch>` run is started per architecture,
//! each tied to the tag run through its summary.

use tracing::{debug, info, warn};

use crate::accessors::{list_check_runs, queue_check_run, update_check_run};
use crate::config::BotConfig;
use crate::correlate::{linked_run_exists, select_latest, stage_state};
use crate::effects::{CheckRunUpdate, GitHubInterpreter, PullRequestData};
use crate::error::PipelineError;
use crate::types::{RepoId, StageOutput, StageRecord, StageState, names};
use crate::wire::{ArtifactsSummary, GitFlavor, ParseError, RunLink, format, parse};

use super::{FanOutReport, dispatch_automation, guard_placeholder, workflow_inputs, workflows};

/// Architectures `git-artifacts` is built for, in dispatch order.
pub const ARCHITECTURES: [&str; 2] = ["x86_64", "i686"];

/// A parsed `/git-artifacts` (or `/mingit-artifacts`) invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitArtifactsRequest {
    pub pull: PullRequestData,
    pub mingit_only: bool,
    /// Forces a fresh `tag-git` run with this release date.
    pub release_date: Option<String>,
}

/// Handles `/git-artifacts`. Returns the report for the tracking comment.
///
/// A pending `tag-git` stage is reported, not duplicated. A succeeded one is
/// reused unless a release date asks for a new tag. The report carries the
/// failed architectures; the caller appends it before calling
/// [`FanOutReport::finish`].
pub async fn request_git_artifacts<G: GitHubInterpreter>(
    github: &G,
    config: &BotConfig,
    repo: &RepoId,
    request: &GitArtifactsRequest,
) -> Result<FanOutReport, PipelineError> {
    let commit = &request.pull.head_sha;

    match stage_state(github, repo, commit, names::TAG_GIT).await? {
        StageState::Succeeded(tag) if request.release_date.is_none() => {
            info!(%repo, %commit, check_run_id = %tag.id, "tag-git already succeeded; starting artifacts");
            return trigger_artifacts_runs(github, config, repo, &tag).await;
        }
        StageState::Pending(tag) => {
            info!(%repo, %commit, check_run_id = %tag.id, "tag-git still pending");
            return Ok(FanOutReport::section(format::stage_already_exists(
                names::TAG_GIT,
                &tag.html_url,
            )));
        }
        _ => {}
    }

    let title = format::tag_title(GitFlavor::from_mingit_only(request.mingit_only), commit);
    let placeholder = queue_check_run(
        github,
        repo,
        names::TAG_GIT,
        commit,
        StageOutput::new(title.clone(), title),
    )
    .await?;

    let result = async {
        let mut inputs = workflow_inputs([
            ("rev", commit.as_str().into()),
            ("owner", repo.owner.as_str().into()),
            ("repo", repo.repo.as_str().into()),
            ("snapshot", "false".into()),
        ]);
        let base = request
            .pull
            .base_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&request.pull.base_ref);
        if base != "main" {
            inputs.insert("release-branch".to_string(), base.into());
        }
        if request.mingit_only {
            inputs.insert("mingit-only".to_string(), "true".into());
        }
        if let Some(date) = &request.release_date {
            inputs.insert("release-date".to_string(), date.as_str().into());
        }

        let run = dispatch_automation(github, config, workflows::TAG_GIT, inputs).await?;
        update_check_run(
            github,
            repo,
            placeholder.id,
            CheckRunUpdate::details_url(&run.html_url),
        )
        .await?;
        Ok::<_, PipelineError>(format::named_workflow_started("tag-git", &run.html_url))
    }
    .await;

    guard_placeholder(github, repo, &placeholder, result)
        .await
        .map(FanOutReport::section)
}

/// Reads the tag run a `tag-git` record reports into.
fn tag_run(config: &BotConfig, tag: &StageRecord) -> Result<RunLink, PipelineError> {
    let link = parse::run_link(tag.output.text()).map_err(|e| {
        PipelineError::malformed(
            format!(
                "Unhandled 'text' attribute of tag-git run {}: {}",
                tag.id, tag.html_url
            ),
            e,
        )
    })?;
    if link.repo != config.automation() {
        return Err(PipelineError::UnexpectedRepository {
            repo: link.repo,
            stage: names::TAG_GIT.to_string(),
            run_id: link.run_id,
            url: tag.html_url.clone(),
        });
    }
    Ok(link)
}

/// The Git version a `tag-git` record tagged: from its text if it says so,
/// otherwise from a `Tag Git <version> @<sha>` summary or title.
fn tag_version(tag: &StageRecord) -> Result<String, PipelineError> {
    parse::tagged_version(tag.output.text())
        .ok()
        .or_else(|| parse::tag_title_version(tag.output.summary()))
        .or_else(|| parse::tag_title_version(tag.output.title()))
        .ok_or_else(|| {
            PipelineError::malformed(
                format!("Could not determine the Git version of tag-git run {}", tag.id),
                ParseError::MissingTaggedVersion(tag.output.title().to_string()),
            )
        })
}

/// Starts the `git-artifacts-<arch>` runs for a successful `tag-git` record.
///
/// Architectures whose latest run from the same tag run is queued, running
/// or succeeded with its workflow run still present are reported as
/// existing. Fails outright only when the tag
/// record itself cannot be read; per-architecture failures are collected.
pub async fn trigger_artifacts_runs<G: GitHubInterpreter>(
    github: &G,
    config: &BotConfig,
    repo: &RepoId,
    tag: &StageRecord,
) -> Result<FanOutReport, PipelineError> {
    if !tag.is_successful() {
        return Err(PipelineError::StageNotSuccessful {
            name: names::TAG_GIT.to_string(),
            url: tag.html_url.clone(),
        });
    }
    let link = tag_run(config, tag)?;
    let version = tag_version(tag)?;
    let summary = ArtifactsSummary {
        version,
        commit: tag.head_sha.clone(),
        tag_run: link.run_id,
    };

    let mut report = FanOutReport::default();
    for architecture in ARCHITECTURES {
        match artifacts_leg(github, config, repo, &summary, architecture).await {
            Ok(line) => report.report.push_str(&line),
            Err(e) => {
                warn!(%repo, architecture, error = %e, "could not start git-artifacts run");
                let name = names::git_artifacts(architecture);
                report
                    .report
                    .push_str(&format!("{}\n", format::target_failed(&name, &e.to_string())));
                report.failures.push(e);
            }
        }
    }
    Ok(report)
}

async fn artifacts_leg<G: GitHubInterpreter>(
    github: &G,
    config: &BotConfig,
    repo: &RepoId,
    summary: &ArtifactsSummary,
    architecture: &str,
) -> Result<String, PipelineError> {
    let name = names::git_artifacts(architecture);
    let existing = select_latest(
        list_check_runs(github, repo, &summary.commit, &name)
            .await?
            .into_iter()
            .filter(|r| parse::derives_from_tag_run(r.output.summary(), summary.tag_run)),
    );
    if let Some(existing) = existing {
        // A deleted workflow run is how a successful build is redone.
        let reusable = existing.is_pending()
            || (existing.is_successful()
                && linked_run_exists(github, &repo.owner, &existing).await?);
        if reusable {
            debug!(%repo, stage = %name, check_run_id = %existing.id, "artifacts run already exists");
            return Ok(format::artifacts_already_exist(architecture, &existing.html_url));
        }
        if existing.is_successful() {
            info!(%repo, stage = %name, check_run_id = %existing.id, "workflow run of successful artifacts stage is gone; starting again");
        }
    }

    let placeholder = queue_check_run(
        github,
        repo,
        &name,
        &summary.commit,
        StageOutput::new(
            format::artifacts_title(&summary.version),
            format::artifacts_summary(summary),
        ),
    )
    .await?;

    let result = async {
        let inputs = workflow_inputs([
            ("architecture", architecture.into()),
            ("tag_git_workflow_run_id", summary.tag_run.0.into()),
        ]);
        let run = dispatch_automation(github, config, workflows::GIT_ARTIFACTS, inputs).await?;
        update_check_run(
            github,
            repo,
            placeholder.id,
            CheckRunUpdate::details_url(&run.html_url),
        )
        .await?;
        Ok::<_, PipelineError>(format::artifacts_started(architecture, &run.html_url))
    }
    .await;

    guard_placeholder(github, repo, &placeholder, result).await
}
