//! Stage correlation.
//!
//! Answers "has this stage already run, for this exact commit, successfully?"
//! from check runs alone. GitHub keeps every attempt of a stage as its own
//! check run, so the most recent attempt (the highest id) is the one that
//! counts. A successful attempt whose workflow run has since been deleted
//! counts as no attempt at all.

mod release;

pub use release::{
    ArtifactsCorrelation, correlate_artifacts, correlate_artifacts_records, tagged_version,
};

use tracing::{debug, warn};

use crate::accessors::{list_check_runs, workflow_run_exists};
use crate::effects::GitHubInterpreter;
use crate::error::PipelineError;
use crate::types::{RepoId, Sha, StageRecord, StageState};
use crate::wire::parse;

/// Picks the most recent attempt: the highest id, the later record on ties.
pub fn select_latest(records: impl IntoIterator<Item = StageRecord>) -> Option<StageRecord> {
    records.into_iter().max_by_key(|r| r.id)
}

/// The most recent `name` check run on `commit`, if any.
pub async fn latest_stage<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    commit: &Sha,
    name: &str,
) -> Result<Option<StageRecord>, PipelineError> {
    let records = list_check_runs(github, repo, commit, name).await?;
    debug!(%repo, %commit, stage = name, attempts = records.len(), "listed stage attempts");
    Ok(select_latest(records))
}

/// Whether the workflow run behind a check run still exists.
///
/// The check run's `details_url` must be a run URL inside `owner`'s
/// organization; anything else cannot be verified and counts as gone.
pub async fn linked_run_exists<G: GitHubInterpreter>(
    github: &G,
    owner: &str,
    record: &StageRecord,
) -> Result<bool, PipelineError> {
    let Some(link) = record
        .details_url
        .as_deref()
        .and_then(parse::workflow_run_url)
        .filter(|link| link.repo.owner == owner)
    else {
        debug!(stage = %record.name, check_run_id = %record.id, "no verifiable run link");
        return Ok(false);
    };
    workflow_run_exists(github, &link.repo, link.run_id).await
}

/// Classifies the most recent `name` stage on `commit`.
///
/// A successful stage whose linked run was deleted is [`StageState::Absent`].
pub async fn stage_state<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    commit: &Sha,
    name: &str,
) -> Result<StageState, PipelineError> {
    let Some(latest) = latest_stage(github, repo, commit, name).await? else {
        return Ok(StageState::Absent);
    };

    match StageState::classify(latest) {
        StageState::Succeeded(record) => {
            if linked_run_exists(github, &repo.owner, &record).await? {
                Ok(StageState::Succeeded(record))
            } else {
                warn!(
                    %repo,
                    %commit,
                    stage = name,
                    check_run_id = %record.id,
                    "successful stage has no surviving workflow run; treating as absent"
                );
                Ok(StageState::Absent)
            }
        }
        other => Ok(other),
    }
}

/// `findLatestSuccessfulStage`: the most recent attempt, if it succeeded and
/// its workflow run still exists.
pub async fn find_latest_successful_stage<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    commit: &Sha,
    name: &str,
) -> Result<Option<StageRecord>, PipelineError> {
    Ok(stage_state(github, repo, commit, name)
        .await?
        .into_succeeded())
}
