//! Webhook handling for GitHub events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Parsing of the `issue_comment` and `check_run` payloads

pub mod events;
pub mod parser;
pub mod signature;

pub use events::{CheckRunAction, CheckRunEvent, CommentAction, GitHubEvent, IssueCommentEvent};
pub use parser::{PayloadError, parse_webhook};
pub use signature::{SignatureError, WebhookSecret};
