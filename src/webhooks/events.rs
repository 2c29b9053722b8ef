//! GitHub webhook event types.
//!
//! Typed representations of the two webhook events the helper acts on:
//!
//! - `issue_comment` - Slash commands on issues and PRs
//! - `check_run` - A `tag-git` run finishing continues the artifacts cascade

use serde::{Deserialize, Serialize};

use crate::types::{CommentId, InstallationId, IssueNumber, RepoId, StageRecord};

/// A parsed GitHub webhook event.
///
/// Unknown or irrelevant events are represented by returning `None` from the
/// parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GitHubEvent {
    /// An issue or PR comment was created, edited, or deleted.
    ///
    /// Note: In GitHub's API, PR comments on the conversation tab are delivered
    /// as `issue_comment` events, not `pull_request_review_comment` events.
    IssueComment(IssueCommentEvent),

    /// A check run was created, completed, or re-requested.
    CheckRun(CheckRunEvent),
}

impl GitHubEvent {
    /// Returns the repository this event belongs to.
    pub fn repo_id(&self) -> &RepoId {
        match self {
            GitHubEvent::IssueComment(e) => &e.repo,
            GitHubEvent::CheckRun(e) => &e.repo,
        }
    }

    /// Returns the App installation the event was delivered for.
    pub fn installation(&self) -> InstallationId {
        match self {
            GitHubEvent::IssueComment(e) => e.installation,
            GitHubEvent::CheckRun(e) => e.installation,
        }
    }
}

/// Action types for issue comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAction {
    Created,
    Edited,
    Deleted,
}

/// An issue comment event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCommentEvent {
    pub repo: RepoId,
    pub action: CommentAction,
    pub installation: InstallationId,

    /// The issue or PR the comment was made on.
    pub issue: IssueNumber,

    /// Whether `issue` is a pull request.
    pub is_pull_request: bool,

    pub issue_title: String,

    /// Empty when the issue has no description.
    pub issue_body: String,

    pub comment_id: CommentId,
    pub comment_url: String,

    /// The comment body (may be empty for deleted comments).
    pub body: String,

    /// Login of the commenter.
    pub commenter: String,
}

/// Action types for check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunAction {
    Created,
    Completed,
    Rerequested,
    RequestedAction,
}

/// A check run event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunEvent {
    pub repo: RepoId,
    pub action: CheckRunAction,
    pub installation: InstallationId,
    pub check_run: StageRecord,
}
