//! Slash commands understood by the helper.
//!
//! These commands are parsed from GitHub issue/PR comments.

use serde::{Deserialize, Serialize};

use crate::components::ReleaseNoteKind;

/// An explicit release note: `/add relnote <type> <message>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitNote {
    pub kind: ReleaseNoteKind,
    pub message: String,
}

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// `/hi`
    Hi,

    /// `/open pr`
    ///
    /// Opens the package-update PR(s) for a `[New <pkg> version]` issue.
    OpenPr,

    /// `/updpkgsums`
    UpdPkgSums,

    /// `/deploy [<package>]`
    ///
    /// Without a package, the package is guessed from the PR title.
    Deploy { package: Option<String> },

    /// `/git-artifacts`, `/mingit-artifacts`, optionally with
    /// `--release-date=<date>`.
    GitArtifacts {
        mingit_only: bool,
        release_date: Option<String>,
    },

    /// `/release`
    Release,

    /// `/prepare-embargoed-release`
    PrepareEmbargoedRelease,

    /// `/publish-embargoed-release`
    PublishEmbargoedRelease,

    /// `/add relnote [<type> <message>]` (also `release note`, `releasenote`)
    ///
    /// Without a type and message, the note is guessed from the issue.
    AddReleaseNote { note: Option<ExplicitNote> },
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Hi => "hi",
            Command::OpenPr => "open-pr",
            Command::UpdPkgSums => "updpkgsums",
            Command::Deploy { .. } => "deploy",
            Command::GitArtifacts { .. } => "git-artifacts",
            Command::Release => "release",
            Command::PrepareEmbargoedRelease => "prepare-embargoed-release",
            Command::PublishEmbargoedRelease => "publish-embargoed-release",
            Command::AddReleaseNote { .. } => "add-release-note",
        }
    }
}
