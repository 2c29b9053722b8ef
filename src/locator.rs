//! Comment Thread Locator.
//!
//! When a `tag-git` run finishes, the event carries the commit and the run,
//! but not the PR comment that asked for it. The comment is found through
//! issue search, then confirmed by the `tag-git` marker the bot appended to
//! it. Anything ambiguous yields no comment: a report in the wrong thread is
//! worse than none.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::accessors::{get_comment, list_comments, search_issues};
use crate::effects::{CommentData, GitHubInterpreter, SearchHit};
use crate::error::PipelineError;
use crate::types::{CommentId, RepoId, Sha};
use crate::wire::parse;

/// The command whose comment tracks a tag → artifacts cascade.
pub const TRACKING_COMMAND: &str = "/git-artifacts";

static TRAILING_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)$").expect("trailing id regex is valid"));

/// The search query for PRs of `repo` mentioning `commit` and the command.
pub fn search_query(repo: &RepoId, commit: &Sha) -> String {
    format!(
        "repo:{}/{} {} type:pr \"{}\"",
        repo.owner,
        repo.repo,
        commit,
        TRACKING_COMMAND.trim_start_matches('/')
    )
}

/// Candidate comment ids: per hit, the first text match that starts with
/// the command.
fn candidates(hits: &[SearchHit]) -> BTreeSet<CommentId> {
    hits.iter()
        .filter_map(|hit| {
            hit.text_matches
                .iter()
                .find(|m| m.fragment.starts_with(TRACKING_COMMAND))
        })
        .filter_map(|m| {
            TRAILING_ID_REGEX
                .captures(&m.object_url)
                .and_then(|caps| caps[1].parse().ok())
                .map(CommentId)
        })
        .collect()
}

/// Finds the comment that requested the `tag-git` run at `tag_git_run_url`.
///
/// Returns `None` when there is no candidate, more than one candidate, or
/// when the marker cannot be confirmed on exactly one comment.
pub async fn find_tracking_comment<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    commit: &Sha,
    tag_git_run_url: &str,
) -> Result<Option<CommentData>, PipelineError> {
    let hits = search_issues(github, &search_query(repo, commit)).await?;
    let mut candidates = candidates(&hits).into_iter();
    let id = match (candidates.next(), candidates.next()) {
        (None, _) => {
            debug!(%repo, %commit, "no tracking comment candidate");
            return Ok(None);
        }
        (Some(id), None) => id,
        (Some(_), Some(_)) => {
            warn!(%repo, %commit, "ambiguous tracking comment candidates");
            return Ok(None);
        }
    };

    let comment = get_comment(github, repo, id).await?;
    if parse::has_tag_git_marker(&comment.body, tag_git_run_url) {
        return Ok(Some(comment));
    }

    // The search may have surfaced an earlier `/git-artifacts` of the same PR.
    let Some(issue) = comment.issue else {
        return Ok(None);
    };
    let mut confirmed = list_comments(github, repo, issue)
        .await?
        .into_iter()
        .filter(|c| {
            c.body.starts_with(TRACKING_COMMAND)
                && parse::has_tag_git_marker(&c.body, tag_git_run_url)
        });
    match (confirmed.next(), confirmed.next()) {
        (Some(comment), None) => Ok(Some(comment)),
        (None, _) => {
            debug!(%repo, %issue, "no comment carries the tag-git marker");
            Ok(None)
        }
        (Some(_), Some(_)) => {
            warn!(%repo, %issue, "several comments carry the tag-git marker");
            Ok(None)
        }
    }
}
