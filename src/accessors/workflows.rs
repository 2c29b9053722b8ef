//! Workflow dispatches and workflow runs.
//!
//! A `workflow_dispatch` call does not return the run it creates. The run is
//! discovered afterwards by listing dispatched runs until a new one shows up.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::effects::{
    GitHubEffect, GitHubInterpreter, GitHubResponse, WorkflowInputs, WorkflowRunData,
};
use crate::error::PipelineError;
use crate::github::GitHubApiError;
use crate::types::{RepoId, WorkflowRunId};

use super::{interpret, unexpected};

/// How long to wait for a dispatched run to become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolling {
    /// Fixed sleep between two lookups.
    pub interval: Duration,
    /// Lookups before giving up.
    pub max_attempts: u32,
}

impl DispatchPolling {
    pub const DEFAULT: DispatchPolling = DispatchPolling {
        interval: Duration::from_secs(2),
        max_attempts: 30,
    };

    /// No sleeping; for tests.
    pub const IMMEDIATE: DispatchPolling = DispatchPolling {
        interval: Duration::ZERO,
        max_attempts: 3,
    };
}

impl Default for DispatchPolling {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The run a dispatch created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub run_id: WorkflowRunId,
    pub html_url: String,
    /// When the dispatch was sent. Display only.
    pub dispatched_at: DateTime<Utc>,
}

/// Dispatches `workflow` on `git_ref` and waits for its run to show up.
///
/// Runs that were already listed before the dispatch are never claimed, so
/// dispatching the same workflow twice in a row yields two distinct runs.
pub async fn dispatch_workflow<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    workflow: &str,
    git_ref: &str,
    inputs: WorkflowInputs,
    polling: DispatchPolling,
) -> Result<DispatchResult, PipelineError> {
    // `created` filters have second granularity.
    let now = Utc::now();
    let since = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);

    let known: HashSet<WorkflowRunId> = list_dispatched_runs(github, repo, workflow, since)
        .await?
        .into_iter()
        .map(|run| run.id)
        .collect();

    debug!(%repo, workflow, ?inputs, "dispatching workflow");
    let effect = GitHubEffect::DispatchWorkflow {
        repo: repo.clone(),
        workflow: workflow.to_string(),
        git_ref: git_ref.to_string(),
        inputs,
    };
    match interpret(github, effect).await? {
        GitHubResponse::WorkflowDispatched => {}
        other => return Err(unexpected("dispatch_workflow", &other)),
    }

    for attempt in 1..=polling.max_attempts {
        let newest = list_dispatched_runs(github, repo, workflow, since)
            .await?
            .into_iter()
            .filter(|run| !known.contains(&run.id))
            .max_by_key(|run| run.id);

        if let Some(run) = newest {
            info!(%repo, workflow, run_id = %run.id, url = %run.html_url, "workflow run started");
            return Ok(DispatchResult {
                run_id: run.id,
                html_url: run.html_url,
                dispatched_at: now,
            });
        }

        if attempt < polling.max_attempts {
            debug!(%repo, workflow, attempt, "dispatched run not visible yet");
            tokio::time::sleep(polling.interval).await;
        }
    }

    Err(PipelineError::Dispatch {
        repo: repo.clone(),
        workflow: workflow.to_string(),
        attempts: polling.max_attempts,
    })
}

async fn list_dispatched_runs<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    workflow: &str,
    since: DateTime<Utc>,
) -> Result<Vec<WorkflowRunData>, PipelineError> {
    let effect = GitHubEffect::ListDispatchedRuns {
        repo: repo.clone(),
        workflow: workflow.to_string(),
        since,
    };
    match interpret(github, effect).await? {
        GitHubResponse::WorkflowRuns(runs) => Ok(runs),
        other => Err(unexpected("list_dispatched_runs", &other)),
    }
}

/// Whether a workflow run still exists. Operators delete runs to force a
/// stage to be re-run.
pub async fn workflow_run_exists<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    run_id: WorkflowRunId,
) -> Result<bool, PipelineError> {
    let effect = GitHubEffect::GetWorkflowRun {
        repo: repo.clone(),
        run_id,
    };
    let result: Result<GitHubResponse, GitHubApiError> =
        github.interpret(effect).await.map_err(Into::into);
    match result {
        Ok(GitHubResponse::WorkflowRun(_)) => Ok(true),
        Ok(other) => Err(unexpected("get_workflow_run", &other)),
        Err(e) if e.is_not_found() => {
            debug!(%repo, run_id = %run_id, "workflow run no longer exists");
            Ok(false)
        }
        Err(e) => Err(PipelineError::GitHub(e)),
    }
}
