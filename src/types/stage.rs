//! Stages: check runs viewed as units of pipeline progress.
//!
//! Nothing here is persisted. A [`StageRecord`] is built from a check-run
//! listing and dropped when the event has been handled.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{CheckRunId, Sha};

/// Check-run names the cascades read and write.
pub mod names {
    pub const TAG_GIT: &str = "tag-git";
    pub const GITHUB_RELEASE: &str = "github-release";
    pub const PREPARE_GITHUB_RELEASE: &str = "prepare-github-release";

    /// `git-artifacts-<arch>`
    pub fn git_artifacts(architecture: &str) -> String {
        format!("git-artifacts-{}", architecture)
    }

    /// `deploy_<arch>`, or plain `deploy` for the combined i686/x86_64 leg.
    pub fn deploy(architecture: Option<&str>) -> String {
        match architecture {
            Some(arch) => format!("deploy_{}", arch),
            None => "deploy".to_string(),
        }
    }
}

/// Lifecycle status of a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    Queued,
    InProgress,
    Completed,
    /// `waiting`, `requested`, `pending` and anything newer.
    #[serde(other)]
    Other,
}

impl CheckRunStatus {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            CheckRunStatus::Queued => "queued",
            CheckRunStatus::InProgress => "in_progress",
            CheckRunStatus::Completed => "completed",
            CheckRunStatus::Other => "pending",
        }
    }
}

/// Final outcome of a completed check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Neutral,
    Skipped,
    TimedOut,
    ActionRequired,
    Stale,
    #[serde(other)]
    Other,
}

impl Conclusion {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Cancelled => "cancelled",
            Conclusion::Neutral => "neutral",
            Conclusion::Skipped => "skipped",
            Conclusion::TimedOut => "timed_out",
            Conclusion::ActionRequired => "action_required",
            Conclusion::Stale => "stale",
            Conclusion::Other => "neutral",
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// The `output` block of a check run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub text: Option<String>,
}

impl StageOutput {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        StageOutput {
            title: Some(title.into()),
            summary: Some(summary.into()),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// One check run, as far as the cascades care about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub id: CheckRunId,
    pub name: String,
    pub head_sha: Sha,
    pub status: CheckRunStatus,
    pub conclusion: Option<Conclusion>,
    pub html_url: String,
    /// Usually the workflow run that reports into this check run.
    pub details_url: Option<String>,
    pub output: StageOutput,
}

impl StageRecord {
    /// `completed` with conclusion `success`.
    pub fn is_successful(&self) -> bool {
        self.status == CheckRunStatus::Completed && self.conclusion == Some(Conclusion::Success)
    }

    /// Not yet completed: queued, in progress, or waiting.
    pub fn is_pending(&self) -> bool {
        self.status != CheckRunStatus::Completed
    }
}

/// A correlated stage, classified.
///
/// This is the explicit form of the state the cascades otherwise infer from
/// check-run text. `Absent` also covers a successful record whose workflow
/// run has since been deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageState {
    Absent,
    Pending(StageRecord),
    Failed(StageRecord),
    Succeeded(StageRecord),
}

impl StageState {
    pub fn classify(record: StageRecord) -> Self {
        if record.is_successful() {
            StageState::Succeeded(record)
        } else if record.is_pending() {
            StageState::Pending(record)
        } else {
            StageState::Failed(record)
        }
    }

    pub fn record(&self) -> Option<&StageRecord> {
        match self {
            StageState::Absent => None,
            StageState::Pending(r) | StageState::Failed(r) | StageState::Succeeded(r) => Some(r),
        }
    }

    pub fn into_succeeded(self) -> Option<StageRecord> {
        match self {
            StageState::Succeeded(r) => Some(r),
            _ => None,
        }
    }
}
