//! Effect interpreter trait.
//!
//! The trait-based design enables:
//! - Mock interpreters for testing (see `test_utils::MockGitHub`)
//! - The octocrab-backed interpreter in `crate::github`

use std::future::Future;

use crate::github::GitHubApiError;

use super::github::{GitHubEffect, GitHubResponse};

/// Interprets GitHub effects against the GitHub API.
///
/// Errors must convert into [`GitHubApiError`] so that callers can tell a
/// deleted resource (`NotFound`) from any other failure.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct CannedInterpreter {
///     response: GitHubResponse,
/// }
///
/// impl GitHubInterpreter for CannedInterpreter {
///     type Error = GitHubApiError;
///
///     async fn interpret(&self, _effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
///         Ok(self.response.clone())
///     }
/// }
/// ```
pub trait GitHubInterpreter: Send + Sync {
    /// The error type returned by this interpreter.
    type Error: Into<GitHubApiError> + Send;

    /// Execute a GitHub effect and return its response.
    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send;
}
