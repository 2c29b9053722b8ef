//! Newtype wrappers for GitHub identifiers.
//!
//! Check runs, workflow runs, comments and issues all use bare integers on the
//! wire. Wrapping them keeps a check-run id from ending up in a workflow
//! dispatch input that expects a workflow-run id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A git commit SHA.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(pub String);

impl Sha {
    /// Creates a new Sha from a string.
    ///
    /// Note: This does not validate the format.
    pub fn new(s: impl Into<String>) -> Self {
        Sha(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Sha {
    fn from(s: String) -> Self {
        Sha(s)
    }
}

impl From<&str> for Sha {
    fn from(s: &str) -> Self {
        Sha(s.to_string())
    }
}

/// A repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Returns a repository in the same organization.
    pub fn sibling(&self, repo: impl Into<String>) -> Self {
        RepoId::new(self.owner.clone(), repo)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $display:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, $display, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                $name(n)
            }
        }
    };
}

numeric_id!(
    /// An issue or pull request number within a repository.
    IssueNumber,
    "#{}"
);

numeric_id!(
    /// A GitHub issue comment ID.
    CommentId,
    "{}"
);

numeric_id!(
    /// A check run ID. Ids grow monotonically, which is what "latest" means.
    CheckRunId,
    "{}"
);

numeric_id!(
    /// A GitHub Actions workflow run ID.
    WorkflowRunId,
    "{}"
);

numeric_id!(
    /// A GitHub App installation ID.
    InstallationId,
    "{}"
);
