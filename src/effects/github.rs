//! GitHub API effect types.
//!
//! These types describe GitHub API operations as data, without executing them.
//! Unlike a single-repository bot, pipelines here touch several repositories
//! (the repository the command came from, the automation repository, and
//! `build-extra`), so every effect names its target repository.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CheckRunId, CheckRunStatus, CommentId, Conclusion, IssueNumber, RepoId, Sha, StageOutput,
    StageRecord, WorkflowRunId,
};

/// GitHub reaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    /// +1 / thumbs up: the command was accepted.
    ThumbsUp,
    /// The command failed.
    Confused,
    Eyes,
    Rocket,
}

impl Reaction {
    /// Returns the GitHub API content string for this reaction.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Reaction::ThumbsUp => "+1",
            Reaction::Confused => "confused",
            Reaction::Eyes => "eyes",
            Reaction::Rocket => "rocket",
        }
    }
}

/// Collaborator permission levels, as reported by the GraphQL API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Admin,
    Maintain,
    Write,
    Triage,
    Read,
}

impl Permission {
    /// Whether this level may trigger pipelines.
    pub fn can_write(&self) -> bool {
        matches!(
            self,
            Permission::Admin | Permission::Maintain | Permission::Write
        )
    }
}

/// Named inputs for a `workflow_dispatch` event.
///
/// Values stay JSON so that numeric run ids are sent as numbers.
pub type WorkflowInputs = BTreeMap<String, serde_json::Value>;

/// Fields for creating a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCheckRun {
    pub name: String,
    pub head_sha: Sha,
    pub status: CheckRunStatus,
    pub output: StageOutput,
}

/// Fields to change on an existing check run. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunUpdate {
    pub status: Option<CheckRunStatus>,
    pub conclusion: Option<Conclusion>,
    pub details_url: Option<String>,
    pub output: Option<StageOutput>,
}

impl CheckRunUpdate {
    /// Marks the check run as completed with `failure`, keeping the title and
    /// summary and recording `message` as its text.
    pub fn failed(title: &str, summary: &str, message: impl Into<String>) -> Self {
        CheckRunUpdate {
            status: Some(CheckRunStatus::Completed),
            conclusion: Some(Conclusion::Failure),
            details_url: None,
            output: Some(StageOutput::new(title, summary).with_text(message)),
        }
    }

    pub fn details_url(url: impl Into<String>) -> Self {
        CheckRunUpdate {
            details_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn output(output: StageOutput) -> Self {
        CheckRunUpdate {
            output: Some(output),
            ..Default::default()
        }
    }
}

/// A GitHub API effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Comments ─────────────────────────────────────────────────────────────
    /// Fetch a single issue comment.
    GetComment { repo: RepoId, comment_id: CommentId },

    /// Post a new comment on an issue or PR.
    CreateComment {
        repo: RepoId,
        issue: IssueNumber,
        body: String,
    },

    /// Replace the body of an existing comment.
    UpdateComment {
        repo: RepoId,
        comment_id: CommentId,
        body: String,
    },

    /// List all comments on an issue or PR.
    ListComments { repo: RepoId, issue: IssueNumber },

    /// Add a reaction to a comment.
    AddReaction {
        repo: RepoId,
        comment_id: CommentId,
        reaction: Reaction,
    },

    // ─── Pull Requests & Permissions ──────────────────────────────────────────
    /// Fetch a pull request (head SHA, target branch).
    GetPullRequest { repo: RepoId, number: IssueNumber },

    /// Look up a user's collaborator permission (via GraphQL).
    GetCollaboratorPermission { repo: RepoId, login: String },

    // ─── Check Runs ───────────────────────────────────────────────────────────
    /// List every check run with the given name on a commit.
    ListCheckRuns {
        repo: RepoId,
        head_sha: Sha,
        name: String,
    },

    /// Create a check run.
    CreateCheckRun { repo: RepoId, check_run: NewCheckRun },

    /// Update a check run.
    UpdateCheckRun {
        repo: RepoId,
        id: CheckRunId,
        update: CheckRunUpdate,
    },

    // ─── Workflows ────────────────────────────────────────────────────────────
    /// Trigger a `workflow_dispatch` event. GitHub does not say which run it
    /// created; see [`GitHubEffect::ListDispatchedRuns`].
    DispatchWorkflow {
        repo: RepoId,
        workflow: String,
        git_ref: String,
        inputs: WorkflowInputs,
    },

    /// List `workflow_dispatch` runs of a workflow created at or after `since`.
    ListDispatchedRuns {
        repo: RepoId,
        workflow: String,
        since: DateTime<Utc>,
    },

    /// Fetch a workflow run. A deleted run yields a `NotFound` error.
    GetWorkflowRun { repo: RepoId, run_id: WorkflowRunId },

    // ─── Search ───────────────────────────────────────────────────────────────
    /// Full-text issue search, with text-match fragments.
    SearchIssues { query: String },
}

impl GitHubEffect {
    /// Short name of the variant, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GitHubEffect::GetComment { .. } => "get_comment",
            GitHubEffect::CreateComment { .. } => "create_comment",
            GitHubEffect::UpdateComment { .. } => "update_comment",
            GitHubEffect::ListComments { .. } => "list_comments",
            GitHubEffect::AddReaction { .. } => "add_reaction",
            GitHubEffect::GetPullRequest { .. } => "get_pull_request",
            GitHubEffect::GetCollaboratorPermission { .. } => "get_collaborator_permission",
            GitHubEffect::ListCheckRuns { .. } => "list_check_runs",
            GitHubEffect::CreateCheckRun { .. } => "create_check_run",
            GitHubEffect::UpdateCheckRun { .. } => "update_check_run",
            GitHubEffect::DispatchWorkflow { .. } => "dispatch_workflow",
            GitHubEffect::ListDispatchedRuns { .. } => "list_dispatched_runs",
            GitHubEffect::GetWorkflowRun { .. } => "get_workflow_run",
            GitHubEffect::SearchIssues { .. } => "search_issues",
        }
    }

    /// Whether applying the effect twice leaves GitHub as applying it once.
    ///
    /// A creation or dispatch that failed in transit may still have taken
    /// effect, so those are never repeated. GitHub answers a repeated
    /// reaction with the existing one.
    pub fn is_idempotent(&self) -> bool {
        !matches!(
            self,
            GitHubEffect::CreateComment { .. }
                | GitHubEffect::CreateCheckRun { .. }
                | GitHubEffect::DispatchWorkflow { .. }
        )
    }
}

// ─── Response Types ───────────────────────────────────────────────────────────

/// Comment data returned from the GitHub API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentData {
    pub id: CommentId,
    pub html_url: String,
    pub body: String,
    /// The issue the comment belongs to (parsed from `issue_url`).
    pub issue: Option<IssueNumber>,
}

/// Pull request data returned from the GitHub API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestData {
    pub number: IssueNumber,
    pub title: String,
    pub head_sha: Sha,
    /// The branch the PR targets.
    pub base_ref: String,
}

/// Workflow run data returned from the GitHub API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunData {
    pub id: WorkflowRunId,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
}

/// One `text_matches` entry of a search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    /// API URL of the matched object (for comments, ends in the comment id).
    pub object_url: String,
    pub object_type: Option<String>,
    pub fragment: String,
}

/// One issue or PR found by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub number: IssueNumber,
    pub title: String,
    pub html_url: String,
    pub text_matches: Vec<TextMatch>,
}

/// Response from a GitHub effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// A comment (fetched, created or updated).
    Comment(CommentData),

    /// All comments on an issue.
    Comments(Vec<CommentData>),

    ReactionAdded,

    PullRequest(PullRequestData),

    /// `None` when the user is not a collaborator at all.
    Permission(Option<Permission>),

    CheckRuns(Vec<StageRecord>),

    /// A created or updated check run.
    CheckRun(StageRecord),

    WorkflowDispatched,

    WorkflowRuns(Vec<WorkflowRunData>),

    WorkflowRun(WorkflowRunData),

    SearchResults(Vec<SearchHit>),
}

impl GitHubResponse {
    /// Short name of the variant, for mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            GitHubResponse::Comment(_) => "comment",
            GitHubResponse::Comments(_) => "comments",
            GitHubResponse::ReactionAdded => "reaction_added",
            GitHubResponse::PullRequest(_) => "pull_request",
            GitHubResponse::Permission(_) => "permission",
            GitHubResponse::CheckRuns(_) => "check_runs",
            GitHubResponse::CheckRun(_) => "check_run",
            GitHubResponse::WorkflowDispatched => "workflow_dispatched",
            GitHubResponse::WorkflowRuns(_) => "workflow_runs",
            GitHubResponse::WorkflowRun(_) => "workflow_run",
            GitHubResponse::SearchResults(_) => "search_results",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_api_strings() {
        assert_eq!(Reaction::ThumbsUp.as_api_str(), "+1");
        assert_eq!(Reaction::Confused.as_api_str(), "confused");
    }

    #[test]
    fn permission_gate() {
        assert!(Permission::Admin.can_write());
        assert!(Permission::Maintain.can_write());
        assert!(Permission::Write.can_write());
        assert!(!Permission::Triage.can_write());
        assert!(!Permission::Read.can_write());
    }

    #[test]
    fn permission_parses_graphql_casing() {
        let p: Permission = serde_json::from_str("\"MAINTAIN\"").unwrap();
        assert_eq!(p, Permission::Maintain);
    }

    #[test]
    fn effect_serializes_with_type_tag() {
        let effect = GitHubEffect::GetComment {
            repo: RepoId::new("git-for-windows", "git"),
            comment_id: CommentId(7),
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json["type"], "get_comment");
        assert_eq!(json["comment_id"], 7);
    }

    #[test]
    fn creations_and_dispatches_are_not_idempotent() {
        let repo = RepoId::new("git-for-windows", "git-for-windows-automation");
        let dispatch = GitHubEffect::DispatchWorkflow {
            repo: repo.clone(),
            workflow: "git-artifacts.yml".to_string(),
            git_ref: "main".to_string(),
            inputs: WorkflowInputs::new(),
        };
        let comment = GitHubEffect::CreateComment {
            repo: repo.clone(),
            issue: IssueNumber(4281),
            body: "Hi @dscho!".to_string(),
        };
        let update = GitHubEffect::UpdateCheckRun {
            repo: repo.clone(),
            id: CheckRunId(45),
            update: CheckRunUpdate::details_url("u"),
        };
        let lookup = GitHubEffect::GetWorkflowRun {
            repo,
            run_id: WorkflowRunId(341),
        };

        assert!(!dispatch.is_idempotent());
        assert!(!comment.is_idempotent());
        assert!(update.is_idempotent());
        assert!(lookup.is_idempotent());
    }

    #[test]
    fn failed_update_keeps_title_and_summary() {
        let update = CheckRunUpdate::failed("Tag Git @abc", "Tag Git @abc", "boom");
        assert_eq!(update.status, Some(CheckRunStatus::Completed));
        assert_eq!(update.conclusion, Some(Conclusion::Failure));
        let output = update.output.unwrap();
        assert_eq!(output.title(), "Tag Git @abc");
        assert_eq!(output.text(), "boom");
    }
}
