//! The check-run entry point.
//!
//! A completed `tag-git` check run in the `git` repository continues the
//! cascade: on success the artifacts runs are started, and either way the
//! outcome is reported into the comment that asked for the tag.

use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::effects::GitHubInterpreter;
use crate::error::PipelineError;
use crate::locator::find_tracking_comment;
use crate::types::{RepoId, StageRecord, names};
use crate::wire::{format, parse};

use super::{TrackingComment, trigger_artifacts_runs};

/// Handles a `check_run`/`completed` event. Returns a status line.
pub async fn handle_completed_check_run<G: GitHubInterpreter>(
    github: &G,
    config: &BotConfig,
    repo: &RepoId,
    record: &StageRecord,
) -> Result<String, PipelineError> {
    if record.name != names::TAG_GIT || *repo != config.org_repo("git") {
        debug!(%repo, stage = %record.name, "check run does not continue a cascade");
        return Ok(format!("Ignoring check run '{}' in {}", record.name, repo));
    }

    // The run link is missing when the workflow failed before reporting.
    let run_url = parse::run_link(record.output.text())
        .map(|link| link.url())
        .ok()
        .or_else(|| {
            record
                .details_url
                .as_deref()
                .and_then(parse::workflow_run_url)
                .map(|link| link.url())
        });

    if !record.is_successful() {
        let Some(run_url) = run_url else {
            warn!(%repo, check_run_id = %record.id, "failed tag-git run has no run link");
            return Ok(format!(
                "Ignoring failed tag-git run without run link: {}",
                record.html_url
            ));
        };
        info!(%repo, commit = %record.head_sha, url = %run_url, "tag-git failed");
        let section = format::named_workflow_failed("tag-git", &run_url);
        return report(github, repo, record, &run_url, &section).await;
    }

    info!(%repo, commit = %record.head_sha, check_run_id = %record.id, "tag-git succeeded; starting artifacts");
    let fan_out = trigger_artifacts_runs(github, config, repo, record).await?;
    // The fan-out only succeeds with a readable run link.
    let run_url = run_url.unwrap_or_else(|| record.html_url.clone());
    let status = report(github, repo, record, &run_url, &fan_out.report).await?;
    fan_out.finish()?;
    Ok(status)
}

async fn report<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    record: &StageRecord,
    run_url: &str,
    section: &str,
) -> Result<String, PipelineError> {
    match find_tracking_comment(github, repo, &record.head_sha, run_url).await? {
        Some(comment) => {
            let updated = TrackingComment::new(repo.clone(), comment.id)
                .append(github, section)
                .await?;
            Ok(format!("I edited the comment: {}", updated.html_url))
        }
        None => {
            warn!(%repo, commit = %record.head_sha, url = run_url, "no tracking comment found");
            Ok(format!(
                "No tracking comment found for {}:\n{}",
                run_url, section
            ))
        }
    }
}
