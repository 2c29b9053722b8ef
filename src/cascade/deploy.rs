//! Package deployment fan-out.
//!
//! `/deploy` on a package PR builds and deploys the package once per
//! architecture target. All placeholders are queued before the first
//! dispatch, so a reader of the PR sees the full set of legs at once. Started
//! legs are linked to their workflow runs before the report is appended.

use tracing::{info, warn};

use crate::accessors::{fail_check_run, queue_check_run, update_check_run};
use crate::config::BotConfig;
use crate::effects::{CheckRunUpdate, CommentData, GitHubInterpreter};
use crate::error::PipelineError;
use crate::types::{ArchitectureTarget, CheckRunId, RepoId, Sha, StageOutput, names};
use crate::wire::format;

use super::{FanOutReport, TrackingComment, dispatch_automation, workflow_inputs, workflows};

/// What to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub package: String,
    /// The PR head to build.
    pub head_sha: Sha,
    /// Title of the PR; an `i686:` prefix restricts MSYS packages to i686.
    pub title: String,
    pub actor: String,
}

/// Deploys a package and reports into `comment`.
///
/// Failed legs are marked as failed and listed in the report; the first
/// failure is returned once the report has been appended.
pub async fn deploy<G: GitHubInterpreter>(
    github: &G,
    config: &BotConfig,
    repo: &RepoId,
    request: &DeployRequest,
    comment: &TrackingComment,
) -> Result<CommentData, PipelineError> {
    let mut targets = ArchitectureTarget::for_deploy(&request.package, &request.title);
    if targets.is_empty() {
        return Err(PipelineError::Heuristics(format!(
            "Nothing to deploy for {}",
            request.package
        )));
    }

    let (title, summary) = format::deploy_output(&request.package);
    let mut queued = Vec::new();
    for target in &mut targets {
        let placeholder = match queue_check_run(
            github,
            repo,
            &names::deploy(target.architecture.as_deref()),
            &request.head_sha,
            StageOutput::new(title.clone(), summary.clone()),
        )
        .await
        {
            Ok(placeholder) => placeholder,
            Err(e) => {
                warn!(%repo, package = %request.package, target = %target.label, error = %e, "could not queue deploy check run");
                for id in &queued {
                    fail_placeholder(github, repo, *id, &title, &summary, &e).await;
                }
                return Err(e);
            }
        };
        target.check_run_id = Some(placeholder.id);
        queued.push(placeholder.id);
    }

    let mut started = Vec::new();
    let mut failed = FanOutReport::default();
    for target in &targets {
        let mut inputs = workflow_inputs([
            ("package", request.package.as_str().into()),
            ("repo", repo.repo.as_str().into()),
            ("ref", request.head_sha.as_str().into()),
            ("actor", request.actor.as_str().into()),
        ]);
        if let Some(architecture) = &target.architecture {
            inputs.insert("architecture".to_string(), architecture.as_str().into());
        }

        match dispatch_automation(github, config, workflows::BUILD_AND_DEPLOY, inputs).await {
            Ok(run) => {
                info!(%repo, package = %request.package, target = %target.label, url = %run.html_url, "deploy started");
                started.push((target, run));
            }
            Err(e) => {
                warn!(%repo, package = %request.package, target = %target.label, error = %e, "deploy could not be started");
                if let Some(id) = target.check_run_id {
                    fail_placeholder(github, repo, id, &title, &summary, &e).await;
                }
                failed.report.push_str(&format!(
                    "\n{}",
                    format::target_failed(&target.label, &e.to_string())
                ));
                failed.failures.push(e);
            }
        }
    }

    for (target, run) in &started {
        if let Some(id) = target.check_run_id
            && let Err(e) =
                update_check_run(github, repo, id, CheckRunUpdate::details_url(&run.html_url)).await
        {
            warn!(check_run_id = %id, error = %e, "could not link check run to its workflow run");
            failed.failures.push(e);
        }
    }

    let links: Vec<(String, String)> = started
        .iter()
        .map(|(target, run)| (target.label.clone(), run.html_url.clone()))
        .collect();
    let section = format!("{}{}", format::targets_started(&links), failed.report)
        .trim_start()
        .to_string();
    let updated = comment.append(github, &section).await?;

    failed.finish()?;
    Ok(updated)
}

/// Marks a deploy check run as failed with `error`. A failure to do so is
/// only logged.
async fn fail_placeholder<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    id: CheckRunId,
    title: &str,
    summary: &str,
    error: &PipelineError,
) {
    if let Err(update_error) =
        fail_check_run(github, repo, id, title, summary, &error.to_string()).await
    {
        warn!(check_run_id = %id, error = %update_error, "could not mark check run as failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessors::DispatchPolling;
    use crate::test_utils::MockGitHub;
    use crate::types::{CheckRunStatus, Conclusion, IssueNumber};

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn msys() -> RepoId {
        RepoId::new("git-for-windows", "MSYS2-packages")
    }

    fn config() -> BotConfig {
        BotConfig::default().with_dispatch_polling(DispatchPolling::IMMEDIATE)
    }

    fn request(package: &str, title: &str) -> DeployRequest {
        DeployRequest {
            package: package.to_string(),
            head_sha: Sha::new(SHA),
            title: title.to_string(),
            actor: "dscho".to_string(),
        }
    }

    #[tokio::test]
    async fn msys_package_deploys_both_architectures() {
        let github = MockGitHub::new();
        let comment_id = github.add_comment(&msys(), IssueNumber(90), "/deploy");
        let comment = TrackingComment::new(msys(), comment_id);

        let updated = deploy(
            &github,
            &config(),
            &msys(),
            &request("gnutls", "gnutls: update to 3.8.0"),
            &comment,
        )
        .await
        .unwrap();

        let created = github.created_check_runs();
        let names: Vec<_> = created.iter().map(|(_, run)| run.name.as_str()).collect();
        assert_eq!(names, vec!["deploy_x86_64", "deploy_i686"]);
        assert_eq!(created[0].1.output.title(), "Build and deploy gnutls");
        assert_eq!(created[0].1.output.summary(), "Deploying gnutls");

        let dispatches = github.dispatches();
        assert_eq!(dispatches.len(), 2);
        assert_eq!(dispatches[0].workflow, "build-and-deploy.yml");
        assert_eq!(dispatches[0].inputs["architecture"], serde_json::json!("x86_64"));
        assert_eq!(dispatches[1].inputs["architecture"], serde_json::json!("i686"));
        assert_eq!(dispatches[0].inputs["package"], serde_json::json!("gnutls"));
        assert_eq!(dispatches[0].inputs["repo"], serde_json::json!("MSYS2-packages"));
        assert_eq!(dispatches[0].inputs["ref"], serde_json::json!(SHA));
        assert_eq!(dispatches[0].inputs["actor"], serde_json::json!("dscho"));

        let url = |i: usize| {
            format!(
                "https://github.com/git-for-windows/git-for-windows-automation/actions/runs/{}",
                dispatches[i].run_id
            )
        };
        assert_eq!(
            updated.body,
            format!(
                "/deploy\n\nThe [x86_64]({}) and the [i686]({}) workflow runs were started.",
                url(0),
                url(1)
            )
        );

        let check_runs: Vec<_> = github
            .effects()
            .into_iter()
            .filter_map(|e| match e {
                crate::effects::GitHubEffect::UpdateCheckRun { id, update, .. } => {
                    update.details_url.map(|url| (id, url))
                }
                _ => None,
            })
            .collect();
        assert_eq!(check_runs.len(), 2);
        assert_eq!(check_runs[0].1, url(0));
        assert_eq!(check_runs[1].1, url(1));
    }

    #[tokio::test]
    async fn mingw_package_uses_combined_leg() {
        let github = MockGitHub::new();
        let repo = RepoId::new("git-for-windows", "MINGW-packages");
        let comment_id = github.add_comment(&repo, IssueNumber(91), "/deploy");

        let updated = deploy(
            &github,
            &config(),
            &repo,
            &request("mingw-w64-curl", "curl: update to 8.0.1"),
            &TrackingComment::new(repo.clone(), comment_id),
        )
        .await
        .unwrap();

        let dispatches = github.dispatches();
        assert_eq!(dispatches.len(), 1);
        assert!(!dispatches[0].inputs.contains_key("architecture"));
        assert_eq!(github.created_check_runs()[0].1.name, "deploy");
        assert!(updated.body.ends_with(&format!(
            "The workflow run [was started](https://github.com/git-for-windows/git-for-windows-automation/actions/runs/{}).",
            dispatches[0].run_id
        )));
    }

    #[tokio::test]
    async fn failing_leg_is_reported_and_fails_the_invocation() {
        let github = MockGitHub::new().with_failing_dispatch(|_, inputs| {
            inputs.get("architecture") == Some(&serde_json::json!("i686"))
        });
        let comment_id = github.add_comment(&msys(), IssueNumber(90), "/deploy");

        let err = deploy(
            &github,
            &config(),
            &msys(),
            &request("bash", "bash: update to 5.2.15"),
            &TrackingComment::new(msys(), comment_id),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::GitHub(_)));
        let body = github.comment_body(comment_id).unwrap();
        assert!(body.contains("The workflow run [was started]"));
        assert!(body.contains("The i686 workflow run could not be started"));

        let runs: Vec<_> = github
            .effects()
            .into_iter()
            .filter_map(|e| match e {
                crate::effects::GitHubEffect::UpdateCheckRun { id, .. } => github.check_run(id),
                _ => None,
            })
            .collect();
        let i686 = runs.iter().find(|r| r.name == "deploy_i686").unwrap();
        assert_eq!(i686.status, CheckRunStatus::Completed);
        assert_eq!(i686.conclusion, Some(Conclusion::Failure));
        let x86_64 = runs.iter().find(|r| r.name == "deploy_x86_64").unwrap();
        assert!(x86_64.details_url.is_some());
    }

    fn check_runs_named(github: &MockGitHub, name: &str) -> Vec<crate::types::StageRecord> {
        github
            .effects()
            .into_iter()
            .filter_map(|e| match e {
                crate::effects::GitHubEffect::UpdateCheckRun { id, .. } => github.check_run(id),
                _ => None,
            })
            .filter(|r| r.name == name)
            .collect()
    }

    #[tokio::test]
    async fn failing_queue_fails_the_placeholders_already_queued() {
        let github = MockGitHub::new().with_failing_check_run(|name| name == "deploy_i686");
        let comment_id = github.add_comment(&msys(), IssueNumber(90), "/deploy");

        let err = deploy(
            &github,
            &config(),
            &msys(),
            &request("bash", "bash: update to 5.2.15"),
            &TrackingComment::new(msys(), comment_id),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::GitHub(_)));
        assert!(github.dispatches().is_empty());
        let x86_64 = check_runs_named(&github, "deploy_x86_64");
        assert_eq!(x86_64.len(), 1);
        assert_eq!(x86_64[0].status, CheckRunStatus::Completed);
        assert_eq!(x86_64[0].conclusion, Some(Conclusion::Failure));
        assert_eq!(
            x86_64[0].output.text(),
            "GitHub API error: creating check run deploy_i686 failed"
        );
    }

    #[tokio::test]
    async fn started_legs_are_linked_even_when_the_comment_cannot_be_updated() {
        let github = MockGitHub::new();

        let err = deploy(
            &github,
            &config(),
            &msys(),
            &request("gnutls", "gnutls: update to 3.8.0"),
            &TrackingComment::new(msys(), crate::types::CommentId(1)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::GitHub(_)));
        assert_eq!(github.dispatches().len(), 2);
        for name in ["deploy_x86_64", "deploy_i686"] {
            let runs = check_runs_named(&github, name);
            assert_eq!(runs.len(), 1, "{name}");
            assert!(runs[0].details_url.is_some(), "{name}");
        }
    }

    #[tokio::test]
    async fn nothing_to_deploy_is_an_error() {
        let github = MockGitHub::new();
        let repo = RepoId::new("git-for-windows", "MINGW-packages");

        let err = deploy(
            &github,
            &config(),
            &repo,
            &request("mingw-w64-clang", ""),
            &TrackingComment::new(repo.clone(), crate::types::CommentId(1)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Heuristics(_)));
        assert!(github.effects().is_empty());
    }
}
