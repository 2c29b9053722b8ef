//! Issue search.

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, SearchHit};
use crate::error::PipelineError;

use super::{interpret, unexpected};

/// Runs a full-text issue/PR search; hits carry their text-match fragments.
pub async fn search_issues<G: GitHubInterpreter>(
    github: &G,
    query: &str,
) -> Result<Vec<SearchHit>, PipelineError> {
    let effect = GitHubEffect::SearchIssues {
        query: query.to_string(),
    };
    match interpret(github, effect).await? {
        GitHubResponse::SearchResults(hits) => Ok(hits),
        other => Err(unexpected("search_issues", &other)),
    }
}
