//! Writers for check-run output and tracking-comment sections.

use crate::types::{RepoId, Sha, WorkflowRunId};

use super::{ArtifactsSummary, GitFlavor, RunLink};

// ─── Check-run output ─────────────────────────────────────────────────────────

/// `For details, see [this run](<url>).`
pub fn run_link(link: &RunLink) -> String {
    format!("For details, see [this run]({}).", link.url())
}

/// `Build Git <version> artifacts`
pub fn artifacts_title(version: &str) -> String {
    format!("Build Git {} artifacts", version)
}

/// `Build Git <version> artifacts from commit <sha> (tag-git run #<id>)`
pub fn artifacts_summary(summary: &ArtifactsSummary) -> String {
    format!(
        "{} from commit {} {}",
        artifacts_title(&summary.version),
        summary.commit,
        tag_run_reference(summary.tag_run)
    )
}

/// `(tag-git run #<id>)`, the suffix that ties an artifacts stage to its tag run.
pub fn tag_run_reference(tag_run: WorkflowRunId) -> String {
    format!("(tag-git run #{})", tag_run)
}

/// Title and summary of a freshly queued `tag-git` check run: `Tag Git @<sha>`.
pub fn tag_title(flavor: GitFlavor, commit: &Sha) -> String {
    format!("Tag {} @{}", flavor.as_str(), commit)
}

/// The line a finished `tag-git` run writes into its text: `Tagged Git <version>`.
pub fn tagged_version(flavor: GitFlavor, version: &str) -> String {
    format!("Tagged {} {}", flavor.as_str(), version)
}

/// Check-run output for the release-style stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// `/release`
    Publish,
    /// `/prepare-embargoed-release`
    PrepareEmbargoed,
    /// `/publish-embargoed-release`
    PublishEmbargoed,
}

impl ReleaseKind {
    /// Title of the placeholder, before the version is known.
    pub fn initial_title(&self, commit: &Sha) -> String {
        match self {
            ReleaseKind::Publish => format!("Publish Git for Windows @{}", commit),
            ReleaseKind::PrepareEmbargoed => {
                format!("Prepare embargoed Git for Windows @{}", commit)
            }
            ReleaseKind::PublishEmbargoed => {
                format!("Publish embargoed Git for Windows @{}", commit)
            }
        }
    }

    pub fn initial_summary(&self, repo: &RepoId) -> String {
        match self {
            ReleaseKind::Publish => format!(
                "Downloading the Git artifacts from the 'git-artifacts' runs and publishing them as a new GitHub Release at {}",
                repo
            ),
            ReleaseKind::PrepareEmbargoed => format!(
                "Downloading the Git artifacts from the 'git-artifacts' runs and publishing them as a new embargoed GitHub Release at {}",
                repo
            ),
            ReleaseKind::PublishEmbargoed => format!(
                "Downloading the Git artifacts from the embargoed-builds GitHub Release and publishing them as a new GitHub Release at {}",
                repo
            ),
        }
    }

    /// Title once the version has been correlated.
    pub fn versioned_title(&self, version: &str, commit: &Sha) -> String {
        match self {
            ReleaseKind::Publish => format!("Publish {} for @{}", version, commit),
            ReleaseKind::PrepareEmbargoed => {
                format!("Prepare embargoed {} for @{}", version, commit)
            }
            ReleaseKind::PublishEmbargoed => {
                format!("Publish embargoed {} for @{}", version, commit)
            }
        }
    }

    /// Summary naming the artifacts runs the release is built from.
    pub fn artifacts_summary(
        &self,
        x86_64: WorkflowRunId,
        i686: WorkflowRunId,
        repo: &RepoId,
    ) -> String {
        let target = match self {
            ReleaseKind::PrepareEmbargoed => "a new embargoed GitHub Release",
            ReleaseKind::Publish | ReleaseKind::PublishEmbargoed => "a new GitHub Release",
        };
        format!(
            "Downloading the Git artifacts from {} and {} and publishing them as {} at {}",
            x86_64, i686, target, repo
        )
    }
}

/// Title and summary of a deploy placeholder.
pub fn deploy_output(package: &str) -> (String, String) {
    (
        format!("Build and deploy {}", package),
        format!("Deploying {}", package),
    )
}

// ─── Tracking comment sections ────────────────────────────────────────────────

/// Appends a section to a comment body.
///
/// Sections are separated by a blank line; a body that already ends in one
/// is not padded again.
pub fn append_section(body: &str, section: &str) -> String {
    let separator = if body.ends_with("\n\n") { "" } else { "\n\n" };
    format!("{}{}{}", body, separator, section)
}

/// `The workflow run [was started](<url>)`
pub fn workflow_started(url: &str) -> String {
    format!("The workflow run [was started]({})", url)
}

/// `` The `<workflow>` workflow run [was started](<url>) ``
///
/// With `tag-git` this doubles as the marker the thread locator looks for.
pub fn named_workflow_started(workflow: &str, url: &str) -> String {
    format!("The `{}` workflow run [was started]({})", workflow, url)
}

/// `The MSYS workflow run [was started](<url>)`, or without a package type.
pub fn typed_workflow_started(package_type: Option<&str>, url: &str) -> String {
    match package_type {
        Some(kind) => format!("The {} workflow run [was started]({})", kind, url),
        None => workflow_started(url),
    }
}

/// `MSYS PR [already exists](<url>)`, or without a package type.
pub fn pr_already_exists(package_type: Option<&str>, url: &str) -> String {
    match package_type {
        Some(kind) => format!("{} PR [already exists]({})", kind, url),
        None => format!("PR [already exists]({})", url),
    }
}

/// `` The `git-artifacts-<arch>` workflow run [was started](<url>).\n ``
pub fn artifacts_started(architecture: &str, url: &str) -> String {
    format!(
        "{}.\n",
        named_workflow_started(&format!("git-artifacts-{}", architecture), url)
    )
}

/// `<stage> run already exists at <url>.\n`
pub fn stage_already_exists(stage: &str, url: &str) -> String {
    format!("{} run already exists at {}.\n", stage, url)
}

/// `git-artifacts-<arch> run already exists at <url>.\n`
pub fn artifacts_already_exist(architecture: &str, url: &str) -> String {
    stage_already_exists(&format!("git-artifacts-{}", architecture), url)
}

/// `` The `<workflow>` workflow run [failed](<url>) ``
pub fn named_workflow_failed(workflow: &str, url: &str) -> String {
    format!("The `{}` workflow run [failed]({})", workflow, url)
}

/// Aggregates the runs of a fan-out, in dispatch order.
///
/// One run: `The workflow run [was started](<url>).`
/// Several: `The [x86_64](<u1>), the [i686](<u2>) and the [arm64](<u3>) workflow runs were started.`
pub fn targets_started(started: &[(String, String)]) -> String {
    match started {
        [] => String::new(),
        [(_, url)] => format!("{}.", workflow_started(url)),
        _ => {
            let last = started.len() - 1;
            let mut out = String::new();
            for (index, (label, url)) in started.iter().enumerate() {
                let lead = match index {
                    0 => "The",
                    i if i == last => " and the",
                    _ => ", the",
                };
                out.push_str(&format!("{} [{}]({})", lead, label, url));
            }
            out.push_str(" workflow runs were started.");
            out
        }
    }
}

/// A target that could not be started.
pub fn target_failed(label: &str, error: &str) -> String {
    format!("The {} workflow run could not be started: {}", label, error)
}

/// `The following deployment(s) are missing:` followed by a bullet list.
pub fn missing_deployments(missing: &[String]) -> String {
    format!(
        "The following deployment(s) are missing:\n\n* {}",
        missing.join("\n* ")
    )
}
