//! Text that later invocations read back.
//!
//! The bot owns no storage. Correlation keys (run ids, versions, commits)
//! live in check-run titles, summaries and texts, and in tracking comments.
//! Every template is written in [`format`] and read in [`parse`]; nothing
//! else in the crate builds or matches these strings.
//!
//! # Formats
//!
//! ```text
//! For details, see [this run](https://github.com/<owner>/<repo>/actions/runs/<id>).
//! Build Git <version> artifacts from commit <sha> (tag-git run #<id>)
//! Tagged Git <version>            (also: Tagged MinGit <version>)
//! Tag Git <version> @<sha>        (also: Tag MinGit ..., version absent while queued)
//! The `tag-git` workflow run [was started](<url>)
//! ```

pub mod format;
pub mod parse;

use serde::{Deserialize, Serialize};

use crate::types::{RepoId, Sha, WorkflowRunId};

pub use parse::ParseError;

/// A link to the workflow run that reports into a check run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunLink {
    pub repo: RepoId,
    pub run_id: WorkflowRunId,
}

impl RunLink {
    pub fn new(repo: RepoId, run_id: WorkflowRunId) -> Self {
        RunLink { repo, run_id }
    }

    pub fn url(&self) -> String {
        format!(
            "https://github.com/{}/{}/actions/runs/{}",
            self.repo.owner, self.repo.repo, self.run_id
        )
    }
}

/// The summary of a `git-artifacts-<arch>` check run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactsSummary {
    pub version: String,
    pub commit: Sha,
    /// The `tag-git` workflow run the artifacts were built from.
    pub tag_run: WorkflowRunId,
}

/// Which flavour of Git a `tag-git` run tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GitFlavor {
    Git,
    MinGit,
}

impl GitFlavor {
    pub fn from_mingit_only(mingit_only: bool) -> Self {
        if mingit_only {
            GitFlavor::MinGit
        } else {
            GitFlavor::Git
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GitFlavor::Git => "Git",
            GitFlavor::MinGit => "MinGit",
        }
    }
}
