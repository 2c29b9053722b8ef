//! Correlation across the per-architecture artifacts stages.
//!
//! A release is built from one `git-artifacts-<arch>` run per architecture.
//! They must agree on the Git version and on the `tag-git` run they were
//! built from; disagreement is an error, never resolved by picking one.

use std::collections::BTreeMap;

use tracing::warn;

use crate::accessors::{list_check_runs, workflow_run_exists};
use crate::effects::GitHubInterpreter;
use crate::error::PipelineError;
use crate::types::{RepoId, Sha, StageRecord, WorkflowRunId, names};
use crate::wire::{RunLink, parse};

use super::select_latest;

/// What the artifacts stages agree on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactsCorrelation {
    pub version: String,
    pub tag_run: WorkflowRunId,
    /// The `git-artifacts` workflow run of each architecture.
    pub runs: BTreeMap<String, WorkflowRunId>,
}

impl ArtifactsCorrelation {
    pub fn run(&self, architecture: &str) -> Option<WorkflowRunId> {
        self.runs.get(architecture).copied()
    }
}

/// Checks the latest artifacts record of each architecture against the others.
///
/// `records` pairs each architecture with its latest record, in the order
/// the architectures should be checked. Run links must point into
/// `automation`.
pub fn correlate_artifacts_records(
    records: &[(String, Option<StageRecord>)],
    automation: &RepoId,
) -> Result<ArtifactsCorrelation, PipelineError> {
    let mut version: Option<String> = None;
    let mut tag_run: Option<WorkflowRunId> = None;
    let mut runs = BTreeMap::new();

    for (architecture, record) in records {
        let name = names::git_artifacts(architecture);
        let record = record
            .as_ref()
            .ok_or_else(|| PipelineError::StageNotFound(name.clone()))?;

        if !record.is_successful() {
            return Err(PipelineError::StageNotSuccessful {
                name,
                url: record.html_url.clone(),
            });
        }

        let link = parse::run_link(record.output.text()).map_err(|e| {
            PipelineError::malformed(
                format!(
                    "Unhandled 'text' attribute of git-artifacts run {}: {}",
                    record.id, record.html_url
                ),
                e,
            )
        })?;
        if &link.repo != automation {
            return Err(PipelineError::UnexpectedRepository {
                repo: link.repo,
                stage: "git-artifacts".to_string(),
                run_id: link.run_id,
                url: record.html_url.clone(),
            });
        }

        let summary = parse::artifacts_summary(record.output.summary()).map_err(|e| {
            PipelineError::malformed(
                format!(
                    "Could not parse summary '{}' of run {}",
                    record.output.summary(),
                    record.id
                ),
                e,
            )
        })?;
        if summary.commit != record.head_sha {
            return Err(PipelineError::UpstreamInconsistency(format!(
                "The '{}' run at {} was built from commit {}, not {}",
                name, record.html_url, summary.commit, record.head_sha
            )));
        }

        match &version {
            None => version = Some(summary.version),
            Some(v) if *v != summary.version => {
                return Err(PipelineError::UpstreamInconsistency(
                    "The 'git-artifacts' runs disagree on the Git version".to_string(),
                ));
            }
            Some(_) => {}
        }
        match tag_run {
            None => tag_run = Some(summary.tag_run),
            Some(t) if t != summary.tag_run => {
                return Err(PipelineError::UpstreamInconsistency(
                    "The 'git-artifacts' runs are based on different 'tag-git' runs".to_string(),
                ));
            }
            Some(_) => {}
        }

        runs.insert(architecture.clone(), link.run_id);
    }

    match (version, tag_run) {
        (Some(version), Some(tag_run)) => Ok(ArtifactsCorrelation {
            version,
            tag_run,
            runs,
        }),
        _ => Err(PipelineError::StageNotFound("git-artifacts".to_string())),
    }
}

/// Finds and cross-checks the artifacts stages of `commit`.
///
/// Only the latest attempt of each architecture counts, and the workflow
/// run it links to must still exist.
pub async fn correlate_artifacts<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    commit: &Sha,
    architectures: &[&str],
    automation: &RepoId,
) -> Result<ArtifactsCorrelation, PipelineError> {
    let mut records = Vec::with_capacity(architectures.len());
    for architecture in architectures {
        let name = names::git_artifacts(architecture);
        let latest = select_latest(list_check_runs(github, repo, commit, &name).await?);
        records.push((architecture.to_string(), latest));
    }
    let correlation = correlate_artifacts_records(&records, automation)?;

    for architecture in architectures {
        let Some(run_id) = correlation.run(architecture) else {
            continue;
        };
        if !workflow_run_exists(github, automation, run_id).await? {
            let name = names::git_artifacts(architecture);
            let url = RunLink::new(automation.clone(), run_id).url();
            warn!(%repo, %commit, stage = %name, url = %url, "artifacts workflow run was deleted");
            return Err(PipelineError::RunDeleted { name, url });
        }
    }
    Ok(correlation)
}

/// Reads the Git version a successful `tag-git` stage tagged.
pub async fn tagged_version<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    commit: &Sha,
) -> Result<String, PipelineError> {
    let latest = super::latest_stage(github, repo, commit, names::TAG_GIT)
        .await?
        .ok_or_else(|| PipelineError::StageNotFound(names::TAG_GIT.to_string()))?;

    if !latest.is_successful() {
        return Err(PipelineError::StageNotSuccessful {
            name: names::TAG_GIT.to_string(),
            url: latest.html_url,
        });
    }

    parse::tagged_version(latest.output.text()).map_err(|e| {
        PipelineError::malformed(
            format!(
                "Unhandled 'text' attribute of tag-git run {}: {}",
                latest.id, latest.html_url
            ),
            e,
        )
    })
}
