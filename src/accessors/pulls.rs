//! Pull requests and collaborator permissions.

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, Permission, PullRequestData};
use crate::error::PipelineError;
use crate::types::{IssueNumber, RepoId};

use super::{interpret, unexpected};

/// Fetches a pull request's head commit and target branch.
pub async fn get_pull_request<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    number: IssueNumber,
) -> Result<PullRequestData, PipelineError> {
    let effect = GitHubEffect::GetPullRequest {
        repo: repo.clone(),
        number,
    };
    match interpret(github, effect).await? {
        GitHubResponse::PullRequest(pull) => Ok(pull),
        other => Err(unexpected("get_pull_request", &other)),
    }
}

/// `None` when `login` is not a collaborator.
pub async fn collaborator_permission<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    login: &str,
) -> Result<Option<Permission>, PipelineError> {
    let effect = GitHubEffect::GetCollaboratorPermission {
        repo: repo.clone(),
        login: login.to_string(),
    };
    match interpret(github, effect).await? {
        GitHubResponse::Permission(permission) => Ok(permission),
        other => Err(unexpected("get_collaborator_permission", &other)),
    }
}
