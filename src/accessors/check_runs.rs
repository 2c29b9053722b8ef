//! Check runs.

use tracing::debug;

use crate::effects::{CheckRunUpdate, GitHubEffect, GitHubInterpreter, GitHubResponse, NewCheckRun};
use crate::error::PipelineError;
use crate::types::{CheckRunId, CheckRunStatus, RepoId, Sha, StageOutput, StageRecord};

use super::{interpret, unexpected};

/// Lists every check run named `name` on `head_sha`, earlier attempts included.
pub async fn list_check_runs<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    head_sha: &Sha,
    name: &str,
) -> Result<Vec<StageRecord>, PipelineError> {
    let effect = GitHubEffect::ListCheckRuns {
        repo: repo.clone(),
        head_sha: head_sha.clone(),
        name: name.to_string(),
    };
    match interpret(github, effect).await? {
        GitHubResponse::CheckRuns(runs) => Ok(runs),
        other => Err(unexpected("list_check_runs", &other)),
    }
}

/// Creates a `queued` placeholder check run.
pub async fn queue_check_run<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    name: &str,
    head_sha: &Sha,
    output: StageOutput,
) -> Result<StageRecord, PipelineError> {
    debug!(%repo, stage = name, commit = %head_sha, "queueing check run");
    let effect = GitHubEffect::CreateCheckRun {
        repo: repo.clone(),
        check_run: NewCheckRun {
            name: name.to_string(),
            head_sha: head_sha.clone(),
            status: CheckRunStatus::Queued,
            output,
        },
    };
    match interpret(github, effect).await? {
        GitHubResponse::CheckRun(record) => Ok(record),
        other => Err(unexpected("create_check_run", &other)),
    }
}

pub async fn update_check_run<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    id: CheckRunId,
    update: CheckRunUpdate,
) -> Result<StageRecord, PipelineError> {
    let effect = GitHubEffect::UpdateCheckRun {
        repo: repo.clone(),
        id,
        update,
    };
    match interpret(github, effect).await? {
        GitHubResponse::CheckRun(record) => Ok(record),
        other => Err(unexpected("update_check_run", &other)),
    }
}

/// Marks a check run `completed`/`failure` with the error as its text.
pub async fn fail_check_run<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    id: CheckRunId,
    title: &str,
    summary: &str,
    error: &str,
) -> Result<StageRecord, PipelineError> {
    debug!(%repo, check_run_id = %id, error, "marking check run as failed");
    update_check_run(github, repo, id, CheckRunUpdate::failed(title, summary, error)).await
}
