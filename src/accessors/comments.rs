//! Issue comments and reactions.

use tracing::debug;

use crate::effects::{CommentData, GitHubEffect, GitHubInterpreter, GitHubResponse, Reaction};
use crate::error::PipelineError;
use crate::types::{CommentId, IssueNumber, RepoId};
use crate::wire::format;

use super::{interpret, unexpected};

pub async fn get_comment<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    comment_id: CommentId,
) -> Result<CommentData, PipelineError> {
    let effect = GitHubEffect::GetComment {
        repo: repo.clone(),
        comment_id,
    };
    match interpret(github, effect).await? {
        GitHubResponse::Comment(comment) => Ok(comment),
        other => Err(unexpected("get_comment", &other)),
    }
}

pub async fn create_comment<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    issue: IssueNumber,
    body: impl Into<String>,
) -> Result<CommentData, PipelineError> {
    let effect = GitHubEffect::CreateComment {
        repo: repo.clone(),
        issue,
        body: body.into(),
    };
    match interpret(github, effect).await? {
        GitHubResponse::Comment(comment) => Ok(comment),
        other => Err(unexpected("create_comment", &other)),
    }
}

pub async fn list_comments<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    issue: IssueNumber,
) -> Result<Vec<CommentData>, PipelineError> {
    let effect = GitHubEffect::ListComments {
        repo: repo.clone(),
        issue,
    };
    match interpret(github, effect).await? {
        GitHubResponse::Comments(comments) => Ok(comments),
        other => Err(unexpected("list_comments", &other)),
    }
}

/// Appends a section to a tracking comment.
///
/// The body is fetched right before the edit; a copy read earlier in the
/// pipeline may already be stale.
pub async fn append_to_comment<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    comment_id: CommentId,
    section: &str,
) -> Result<CommentData, PipelineError> {
    let current = get_comment(github, repo, comment_id).await?;
    let body = format::append_section(&current.body, section);
    debug!(%repo, comment_id = %comment_id, "appending to tracking comment");

    let effect = GitHubEffect::UpdateComment {
        repo: repo.clone(),
        comment_id,
        body,
    };
    match interpret(github, effect).await? {
        GitHubResponse::Comment(comment) => Ok(comment),
        other => Err(unexpected("update_comment", &other)),
    }
}

pub async fn add_reaction<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    comment_id: CommentId,
    reaction: Reaction,
) -> Result<(), PipelineError> {
    let effect = GitHubEffect::AddReaction {
        repo: repo.clone(),
        comment_id,
        reaction,
    };
    match interpret(github, effect).await? {
        GitHubResponse::ReactionAdded => Ok(()),
        other => Err(unexpected("add_reaction", &other)),
    }
}
