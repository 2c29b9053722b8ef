//! Readers for check-run output and tracking-comment sections.
//!
//! Each reader inverts one writer in [`super::format`].

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::types::{RepoId, Sha, WorkflowRunId};

use super::{ArtifactsSummary, RunLink, format};

/// Errors that can occur when reading stage output back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The text has no `For details, see [this run](...)` link.
    #[error("no run link in {0:?}")]
    MissingRunLink(String),

    /// The summary is not `Build Git <version> artifacts from commit <sha> (tag-git run #<id>)`.
    #[error("could not parse artifacts summary {0:?}")]
    ArtifactsSummary(String),

    /// The text has no `Tagged Git <version>` line.
    #[error("no tagged version in {0:?}")]
    MissingTaggedVersion(String),

    /// A run id did not fit into 64 bits.
    #[error("invalid run id {0:?}")]
    RunId(String),
}

static RUN_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"For details, see \[this run\]\(https://github\.com/([^/]+)/([^/]+)/actions/runs/(\d+)\)")
        .expect("run link regex is valid")
});

static WORKFLOW_RUN_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+)/actions/runs/([0-9]+)")
        .expect("workflow run URL regex is valid")
});

static ARTIFACTS_SUMMARY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Build Git (\S+) artifacts from commit (\S+) \(tag-git run #(\d+)\)$")
        .expect("artifacts summary regex is valid")
});

static TAGGED_VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Tagged (?:Min)?Git (v\d+\S+)").expect("tagged version regex is valid")
});

static TAG_TITLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Tag (?:Min)?Git (\S+) @\S+$").expect("tag title regex is valid")
});

fn parse_run_id(digits: &str) -> Result<WorkflowRunId, ParseError> {
    digits
        .parse()
        .map(WorkflowRunId)
        .map_err(|_| ParseError::RunId(digits.to_string()))
}

/// Reads the `For details, see [this run](...)` link out of a check-run text.
pub fn run_link(text: &str) -> Result<RunLink, ParseError> {
    let caps = RUN_LINK_REGEX
        .captures(text)
        .ok_or_else(|| ParseError::MissingRunLink(text.to_string()))?;
    Ok(RunLink::new(
        RepoId::new(&caps[1], &caps[2]),
        parse_run_id(&caps[3])?,
    ))
}

/// Reads a workflow run URL (typically a check run's `details_url`).
///
/// Returns `None` for anything that is not a run URL.
pub fn workflow_run_url(url: &str) -> Option<RunLink> {
    let caps = WORKFLOW_RUN_URL_REGEX.captures(url)?;
    let run_id = parse_run_id(&caps[3]).ok()?;
    Some(RunLink::new(RepoId::new(&caps[1], &caps[2]), run_id))
}

/// Reads a `git-artifacts-<arch>` summary.
pub fn artifacts_summary(summary: &str) -> Result<ArtifactsSummary, ParseError> {
    let caps = ARTIFACTS_SUMMARY_REGEX
        .captures(summary)
        .ok_or_else(|| ParseError::ArtifactsSummary(summary.to_string()))?;
    Ok(ArtifactsSummary {
        version: caps[1].to_string(),
        commit: Sha::new(&caps[2]),
        tag_run: parse_run_id(&caps[3])?,
    })
}

/// Whether an artifacts summary names the given tag run.
///
/// Lenient on purpose: older summaries lack the word `artifacts`, but all
/// of them end in the tag-run reference.
pub fn derives_from_tag_run(summary: &str, tag_run: WorkflowRunId) -> bool {
    summary.ends_with(&format::tag_run_reference(tag_run))
}

/// Reads `Tagged Git <version>` (or `Tagged MinGit <version>`) out of a `tag-git` text.
pub fn tagged_version(text: &str) -> Result<String, ParseError> {
    TAGGED_VERSION_REGEX
        .captures(text)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ParseError::MissingTaggedVersion(text.to_string()))
}

/// Reads the version out of a finished `tag-git` title or summary
/// (`Tag Git v2.40.0 @<sha>`).
///
/// A queued title (`Tag Git @<sha>`) has no version yet.
pub fn tag_title_version(title: &str) -> Option<String> {
    TAG_TITLE_REGEX
        .captures(title)
        .map(|caps| caps[1].to_string())
}

/// Whether a comment body carries the marker for a `tag-git` run.
pub fn has_tag_git_marker(body: &str, tag_git_run_url: &str) -> bool {
    body.contains(&format::named_workflow_started("tag-git", tag_git_run_url))
}
