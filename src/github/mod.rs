//! GitHub API client and effect interpreter.
//!
//! This module provides the implementation for executing GitHub effects via the octocrab
//! library. It implements the `GitHubInterpreter` trait defined in the effects module.
//!
//! Key features:
//! - One [`InstallationClient`] per event, with a lazily minted, memoized token
//! - Exponential backoff retry for transient failures
//! - Distinguishes transient, permanent and not-found errors

mod client;
mod error;
mod interpreter;
mod retry;

pub use client::{
    AppClientError, AppInstallations, InstallationClient, Installations, app_client,
};
pub use error::{GitHubApiError, GitHubErrorKind};
pub use retry::{RetryConfig, RetryPolicy, retry_with_backoff};
