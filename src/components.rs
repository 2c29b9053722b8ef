//! Component-update heuristics.
//!
//! Git for Windows tracks new upstream releases of its components in issues
//! titled like `[New gnutls version] GnuTLS 3.8.0`, and the matching package
//! PRs are titled `gnutls: update to 3.8.0`. The pipelines only need a few
//! answers from those titles, collected in [`ComponentHeuristics`].

use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A component update derived from an issue or PR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentUpdate {
    pub package: String,
    pub version: String,
}

/// The section of the release notes an entry goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseNoteKind {
    Blurb,
    Feature,
    Bug,
}

impl ReleaseNoteKind {
    /// Case-insensitive, as typed in a comment.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "blurb" => Some(ReleaseNoteKind::Blurb),
            "feature" => Some(ReleaseNoteKind::Feature),
            "bug" => Some(ReleaseNoteKind::Bug),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseNoteKind::Blurb => "blurb",
            ReleaseNoteKind::Feature => "feature",
            ReleaseNoteKind::Bug => "bug",
        }
    }
}

/// A release-note entry for `add-release-note.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNote {
    pub kind: ReleaseNoteKind,
    pub message: String,
    /// Set when the note was guessed from a component update.
    pub update: Option<ComponentUpdate>,
}

/// The questions the pipelines ask about component updates.
pub trait ComponentHeuristics: Send + Sync {
    /// Derives package and version from an issue's or PR's title and body.
    fn guess_component_update(
        &self,
        title: &str,
        body: &str,
    ) -> Result<ComponentUpdate, PipelineError>;

    /// Whether the package ships both as an MSYS and a `mingw-w64-` package.
    fn needs_both_msys_and_mingw(&self, package: &str) -> bool;

    /// Derives a release note from an issue's or PR's title and body.
    fn guess_release_note(&self, title: &str, body: &str) -> Result<ReleaseNote, PipelineError>;

    /// Packages of `update` that have not been deployed yet.
    fn missing_deployments(
        &self,
        update: &ComponentUpdate,
    ) -> impl Future<Output = Result<Vec<String>, PipelineError>> + Send;
}

static NEW_VERSION_TITLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[New (\S+) version\] (?:[^0-9]+\s+)?(\S+)").expect("new version regex is valid")
});

static UPDATE_TITLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+): update to (\S+)").expect("update title regex is valid")
});

static NEW_VERSION_BODY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^# \[New (\S+) version\] (?:[^0-9]+\s+)?(\S+)")
        .expect("new version body regex is valid")
});

static VERSION_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:GCM |openssl-|OpenSSL_|curl-|Perl-|v|V)").expect("version prefix regex is valid")
});

static MARKDOWN_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]+\]\((https?://[^)\s]+)\)").expect("markdown link regex is valid")
});

/// Upstream names that do not match the package name.
const PACKAGE_ALIASES: &[(&str, &str)] = &[
    ("gcm", "mingw-w64-git-credential-manager"),
    ("git-credential-manager", "mingw-w64-git-credential-manager"),
    ("git-lfs", "mingw-w64-git-lfs"),
    ("git-sizer", "mingw-w64-git-sizer"),
    ("cv2pdb", "mingw-w64-cv2pdb"),
    ("wintoast", "mingw-w64-wintoast"),
];

/// Packages that exist as `<name>` and as `mingw-w64-<name>`.
const MSYS_AND_MINGW_PACKAGES: &[&str] = &[
    "curl",
    "expat",
    "gnutls",
    "libgpg-error",
    "libgcrypt",
    "openssl",
    "pcre2",
];

/// Names used in release notes.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("bash", "Bash"),
    ("curl", "cURL"),
    ("expat", "Expat"),
    ("git-credential-manager", "Git Credential Manager"),
    ("git-lfs", "Git LFS"),
    ("gnupg", "GNU Privacy Guard"),
    ("gnutls", "GNU TLS"),
    ("mintty", "MinTTY"),
    ("openssh", "OpenSSH"),
    ("openssl", "OpenSSL"),
    ("pcre2", "PCRE2"),
    ("perl", "Perl"),
];

/// Heuristics that look at nothing but titles and bodies.
///
/// Cannot see package repositories, so it never reports a deployment as
/// missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleHeuristics;

impl TitleHeuristics {
    fn display_name(package: &str) -> String {
        let bare = package.strip_prefix("mingw-w64-").unwrap_or(package);
        DISPLAY_NAMES
            .iter()
            .find(|(name, _)| *name == bare)
            .map(|(_, display)| display.to_string())
            .unwrap_or_else(|| bare.to_string())
    }
}

impl ComponentHeuristics for TitleHeuristics {
    fn guess_component_update(
        &self,
        title: &str,
        body: &str,
    ) -> Result<ComponentUpdate, PipelineError> {
        let caps = NEW_VERSION_TITLE_REGEX
            .captures(title)
            .or_else(|| UPDATE_TITLE_REGEX.captures(title))
            .or_else(|| NEW_VERSION_BODY_REGEX.captures(body))
            .ok_or_else(|| {
                PipelineError::Heuristics(format!(
                    "Could not guess component-update details from title '{}'",
                    title
                ))
            })?;

        let name = &caps[1];
        let package = PACKAGE_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, package)| package.to_string())
            .unwrap_or_else(|| name.to_string());
        let version = VERSION_PREFIX_REGEX
            .replace(&caps[2], "")
            .replace('_', ".");

        Ok(ComponentUpdate { package, version })
    }

    fn needs_both_msys_and_mingw(&self, package: &str) -> bool {
        MSYS_AND_MINGW_PACKAGES.contains(&package)
    }

    fn guess_release_note(&self, title: &str, body: &str) -> Result<ReleaseNote, PipelineError> {
        let update = self.guess_component_update(title, body)?;
        let label = format!("{} v{}", Self::display_name(&update.package), update.version);
        let message = match MARKDOWN_LINK_REGEX.captures(body) {
            Some(caps) => format!("Comes with [{}]({}).", label, &caps[1]),
            None => format!("Comes with {}.", label),
        };
        Ok(ReleaseNote {
            kind: ReleaseNoteKind::Feature,
            message,
            update: Some(update),
        })
    }

    /// Always empty: titles say nothing about deployments, so the baseline
    /// never holds back a release note.
    async fn missing_deployments(
        &self,
        _update: &ComponentUpdate,
    ) -> Result<Vec<String>, PipelineError> {
        Ok(Vec::new())
    }
}
