//! Parser for slash commands in comment text.
//!
//! This module provides a pure parser that turns a comment body into a
//! structured command. Unlike mention-style bots, the whole comment is the
//! command: `/release` with anything after it is not `/release`.

use std::sync::LazyLock;

use regex::Regex;

use crate::components::ReleaseNoteKind;

use super::types::{Command, ExplicitNote};

static DEPLOY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/deploy(?:\s+(\S+)\s*)?$").expect("deploy regex is valid")
});

static GIT_ARTIFACTS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(min)?git-artifacts(?: --release-date=(.*))?$")
        .expect("git-artifacts regex is valid")
});

static RELEASE_NOTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^/add (?:relnote|release ?note)(?:\s+(blurb|feature|bug)\s+(.*))?$")
        .expect("release note regex is valid")
});

/// Parses a comment body as a slash command.
///
/// # Parsing Rules
///
/// - The body must consist of the command alone; trailing whitespace is ignored
/// - Command words are case-sensitive, except for `/add relnote`
/// - The release-note message may span several lines
/// - Returns `None` for anything else
///
/// # Examples
///
/// ```
/// use gfw_helper::commands::{parse_command, Command};
///
/// assert_eq!(parse_command("/release"), Some(Command::Release));
/// assert_eq!(
///     parse_command("/deploy mingw-w64-git-lfs"),
///     Some(Command::Deploy { package: Some("mingw-w64-git-lfs".to_string()) })
/// );
/// assert_eq!(parse_command("/release now"), None);
/// ```
pub fn parse_command(body: &str) -> Option<Command> {
    let body = body.trim_end();

    match body {
        "/hi" => return Some(Command::Hi),
        "/open pr" => return Some(Command::OpenPr),
        "/updpkgsums" => return Some(Command::UpdPkgSums),
        "/release" => return Some(Command::Release),
        "/prepare-embargoed-release" => return Some(Command::PrepareEmbargoedRelease),
        "/publish-embargoed-release" => return Some(Command::PublishEmbargoedRelease),
        _ => {}
    }

    if let Some(caps) = DEPLOY_REGEX.captures(body) {
        return Some(Command::Deploy {
            package: caps.get(1).map(|m| m.as_str().to_string()),
        });
    }

    if let Some(caps) = GIT_ARTIFACTS_REGEX.captures(body) {
        return Some(Command::GitArtifacts {
            mingit_only: caps.get(1).is_some(),
            release_date: caps.get(2).map(|m| m.as_str().to_string()),
        });
    }

    if let Some(caps) = RELEASE_NOTE_REGEX.captures(body) {
        let note = match (caps.get(1), caps.get(2)) {
            (Some(kind), Some(message)) => Some(ExplicitNote {
                kind: ReleaseNoteKind::parse(kind.as_str())?,
                message: message.as_str().to_string(),
            }),
            _ => None,
        };
        return Some(Command::AddReleaseNote { note });
    }

    None
}
