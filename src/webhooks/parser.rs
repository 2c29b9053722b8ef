//! GitHub webhook payload parser.
//!
//! This module parses raw webhook JSON payloads into typed [`GitHubEvent`] values.
//! The parser is designed to be robust against unknown fields and event types.
//!
//! # Parsing Strategy
//!
//! 1. The event type is determined from the `X-GitHub-Event` header
//! 2. The payload is parsed according to the event type
//! 3. Unknown event types return `Ok(None)` (ignored, not error)
//! 4. Malformed payloads return `Err` with details

use serde::Deserialize;
use thiserror::Error;

use crate::types::{
    CheckRunId, CheckRunStatus, CommentId, Conclusion, InstallationId, IssueNumber, RepoId, Sha,
    StageOutput, StageRecord,
};

use super::events::{
    CheckRunAction, CheckRunEvent, CommentAction, GitHubEvent, IssueCommentEvent,
};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Field has invalid value (e.g., unknown action).
    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Parses a webhook payload into a typed event.
///
/// # Returns
///
/// * `Ok(Some(event))` - Successfully parsed a known event type
/// * `Ok(None)` - Unknown event type (ignored, not an error)
/// * `Err(e)` - Malformed payload or missing required fields
///
/// # Examples
///
/// ```
/// use gfw_helper::webhooks::{GitHubEvent, parse_webhook};
///
/// let payload = br#"{
///     "action": "created",
///     "comment": {
///         "id": 123,
///         "body": "/hi",
///         "html_url": "https://github.com/owner/repo/issues/42#issuecomment-123",
///         "user": { "login": "octocat" }
///     },
///     "issue": { "number": 42, "title": "Hello" },
///     "repository": { "owner": { "login": "owner" }, "name": "repo" },
///     "installation": { "id": 7 }
/// }"#;
///
/// let event = parse_webhook("issue_comment", payload).unwrap();
/// assert!(matches!(event, Some(GitHubEvent::IssueComment(_))));
/// assert!(parse_webhook("ping", b"{}").unwrap().is_none());
/// ```
pub fn parse_webhook(
    event_type: &str,
    payload: &[u8],
) -> Result<Option<GitHubEvent>, PayloadError> {
    match event_type {
        "issue_comment" => parse_issue_comment(payload).map(|e| Some(GitHubEvent::IssueComment(e))),
        "check_run" => parse_check_run(payload).map(|e| Some(GitHubEvent::CheckRun(e))),
        // Unknown event types are ignored (not an error)
        _ => Ok(None),
    }
}

// ============================================================================
// Raw payload structures for deserialization
//
// These match GitHub's webhook JSON structure. We use Option<T> liberally to
// handle missing fields gracefully, then validate required fields explicitly.
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawOwner,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawInstallation {
    id: u64,
}

// ============================================================================
// issue_comment event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawIssueCommentPayload {
    action: String,
    comment: RawComment,
    issue: RawIssue,
    repository: RawRepository,
    installation: RawInstallation,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
    body: Option<String>,
    html_url: String,
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: Option<String>,
    body: Option<String>,
    // If this field is present, the issue is actually a PR
    pull_request: Option<serde_json::Value>,
}

fn parse_issue_comment(payload: &[u8]) -> Result<IssueCommentEvent, PayloadError> {
    let raw: RawIssueCommentPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "created" => CommentAction::Created,
        "edited" => CommentAction::Edited,
        "deleted" => CommentAction::Deleted,
        other => {
            return Err(PayloadError::InvalidField {
                field: "action",
                value: other.to_string(),
            });
        }
    };

    Ok(IssueCommentEvent {
        repo: RepoId::new(raw.repository.owner.login, raw.repository.name),
        action,
        installation: InstallationId(raw.installation.id),
        issue: IssueNumber(raw.issue.number),
        is_pull_request: raw.issue.pull_request.is_some(),
        issue_title: raw.issue.title.unwrap_or_default(),
        issue_body: raw.issue.body.unwrap_or_default(),
        comment_id: CommentId(raw.comment.id),
        comment_url: raw.comment.html_url,
        body: raw.comment.body.unwrap_or_default(),
        commenter: raw.comment.user.login,
    })
}

// ============================================================================
// check_run event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCheckRunPayload {
    action: String,
    check_run: RawCheckRun,
    repository: RawRepository,
    installation: RawInstallation,
}

#[derive(Debug, Deserialize)]
struct RawCheckRun {
    id: u64,
    name: String,
    head_sha: String,
    status: CheckRunStatus,
    conclusion: Option<Conclusion>,
    html_url: Option<String>,
    details_url: Option<String>,
    #[serde(default)]
    output: StageOutput,
}

fn parse_check_run(payload: &[u8]) -> Result<CheckRunEvent, PayloadError> {
    let raw: RawCheckRunPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "created" => CheckRunAction::Created,
        "completed" => CheckRunAction::Completed,
        "rerequested" => CheckRunAction::Rerequested,
        "requested_action" => CheckRunAction::RequestedAction,
        other => {
            return Err(PayloadError::InvalidField {
                field: "action",
                value: other.to_string(),
            });
        }
    };

    let run = raw.check_run;
    Ok(CheckRunEvent {
        repo: RepoId::new(raw.repository.owner.login, raw.repository.name),
        action,
        installation: InstallationId(raw.installation.id),
        check_run: StageRecord {
            id: CheckRunId(run.id),
            name: run.name,
            head_sha: Sha::new(run.head_sha),
            status: run.status,
            conclusion: run.conclusion,
            html_url: run.html_url.unwrap_or_default(),
            details_url: run.details_url,
            output: run.output,
        },
    })
}
