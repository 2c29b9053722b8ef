//! Webhook endpoint handler.
//!
//! Deliveries are handled to completion before the response is sent, so the
//! response body is the status line of whatever the delivery triggered.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::cascade::handle_completed_check_run;
use crate::components::ComponentHeuristics;
use crate::error::PipelineError;
use crate::github::Installations;
use crate::router::route_comment;
use crate::webhooks::{
    CheckRunAction, CommentAction, GitHubEvent, PayloadError, SignatureError, parse_webhook,
};

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Go away, you are not a valid GitHub webhook: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    /// The triggered pipeline failed; the message is the pipeline's own.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature(_) => StatusCode::FORBIDDEN,
            WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::Pipeline(_) | WebhookError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `X-GitHub-Event`: Event type (e.g., "issue_comment", "check_run")
///   - `X-Hub-Signature-256`: HMAC-SHA256 signature of the payload
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 200 OK: the status line, or `Ignored` for events nothing listens to
/// - 400 Bad Request: Missing event header or malformed payload
/// - 403 Forbidden: Missing or invalid signature
/// - 500 Internal Server Error: the pipeline failed; the body is the error
pub async fn webhook_handler<I, H>(
    State(app_state): State<AppState<I, H>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, String), WebhookError>
where
    I: Installations,
    H: ComponentHeuristics + 'static,
{
    let event_type = header(&headers, HEADER_EVENT).ok_or(WebhookError::MissingHeader(HEADER_EVENT))?;
    let delivery = header(&headers, HEADER_DELIVERY).unwrap_or("-");

    debug!(delivery, event_type, "Received webhook");

    // Nothing is parsed before the signature checks out.
    if let Err(e) = app_state
        .webhook_secret()
        .verify(&body, header(&headers, HEADER_SIGNATURE))
    {
        warn!(delivery, error = %e, "Rejected webhook");
        return Err(e.into());
    }

    let Some(event) = parse_webhook(event_type, &body)? else {
        debug!(delivery, event_type, "Ignoring event type");
        return Ok((StatusCode::OK, "Ignored".to_string()));
    };

    let handled = matches!(
        &event,
        GitHubEvent::IssueComment(comment) if comment.action == CommentAction::Created
    ) || matches!(
        &event,
        GitHubEvent::CheckRun(check_run) if check_run.action == CheckRunAction::Completed
    );
    if !handled {
        debug!(delivery, event_type, repo = %event.repo_id(), "Ignoring action");
        return Ok((StatusCode::OK, "Ignored".to_string()));
    }

    let repo = event.repo_id().clone();
    // GitHub hangs up after ten seconds and hyper then drops this future. The
    // pipeline must not be dropped with it.
    let status = tokio::spawn(handle_event(app_state, event)).await??;

    info!(delivery, %repo, status = %status, "Webhook handled");
    Ok((StatusCode::OK, status))
}

async fn handle_event<I, H>(
    app_state: AppState<I, H>,
    event: GitHubEvent,
) -> Result<String, PipelineError>
where
    I: Installations,
    H: ComponentHeuristics + 'static,
{
    let github = app_state.installations().client_for(event.installation());
    let config = app_state.config();

    match &event {
        GitHubEvent::IssueComment(comment) => {
            route_comment(&github, config, app_state.heuristics(), comment).await
        }
        GitHubEvent::CheckRun(check_run) => {
            handle_completed_check_run(&github, config, &check_run.repo, &check_run.check_run)
                .await
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
