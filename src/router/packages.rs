//! Handlers for the package repositories: `/open pr`, `/updpkgsums` and
//! `/deploy`.

use tracing::info;

use crate::accessors::search_issues;
use crate::cascade::{DeployRequest, dispatch_automation, workflow_inputs, workflows};
use crate::components::ComponentHeuristics;
use crate::effects::GitHubInterpreter;
use crate::error::PipelineError;
use crate::wire::format;

use super::Invocation;

/// `/open pr` on a `[New <pkg> version]` issue.
///
/// Packages that ship both as MSYS and MINGW packages get one PR each.
pub(super) async fn open_pr<G: GitHubInterpreter, H: ComponentHeuristics>(
    invocation: &Invocation<'_, G, H>,
) -> Result<String, PipelineError> {
    invocation.require_write().await?;

    let event = invocation.event;
    let update = invocation
        .heuristics
        .guess_component_update(&event.issue_title, &event.issue_body)?;

    invocation.acknowledge().await?;

    let flavours = if invocation.heuristics.needs_both_msys_and_mingw(&update.package) {
        vec![
            (Some("MSYS"), update.package.clone()),
            (Some("MINGW"), format!("mingw-w64-{}", update.package)),
        ]
    } else {
        vec![(None, update.package.clone())]
    };

    let mut status = String::new();
    for (package_type, package) in flavours {
        let title = format!("{}: update to {}", package, update.version);
        let query = format!(
            "org:{} is:pull-request \"{}\" in:title",
            invocation.config.active_org, title
        );
        let hits = search_issues(invocation.github, &query).await?;

        let section = match hits.iter().find(|hit| hit.title == title) {
            Some(existing) => {
                info!(package = %package, url = %existing.html_url, "update PR already exists");
                format::pr_already_exists(package_type, &existing.html_url)
            }
            None => {
                let run = dispatch_automation(
                    invocation.github,
                    invocation.config,
                    workflows::OPEN_PR,
                    workflow_inputs([
                        ("package", package.as_str().into()),
                        ("version", update.version.as_str().into()),
                        ("actor", event.commenter.as_str().into()),
                    ]),
                )
                .await?;
                format::typed_workflow_started(package_type, &run.html_url)
            }
        };
        status = invocation.report(&section).await?;
    }
    Ok(status)
}

/// `/updpkgsums` on a package PR.
pub(super) async fn updpkgsums<G: GitHubInterpreter, H: ComponentHeuristics>(
    invocation: &Invocation<'_, G, H>,
) -> Result<String, PipelineError> {
    invocation.require_write().await?;
    invocation.acknowledge().await?;

    let event = invocation.event;
    let run = dispatch_automation(
        invocation.github,
        invocation.config,
        workflows::UPDPKGSUMS,
        workflow_inputs([
            ("repo", event.repo.repo.as_str().into()),
            ("pr-number", event.issue.0.into()),
            ("actor", event.commenter.as_str().into()),
        ]),
    )
    .await?;

    invocation
        .report(&format!("{}.", format::workflow_started(&run.html_url)))
        .await
}

/// `/deploy [<package>]` on a package PR.
pub(super) async fn deploy<G: GitHubInterpreter, H: ComponentHeuristics>(
    invocation: &Invocation<'_, G, H>,
    package: Option<&str>,
) -> Result<String, PipelineError> {
    invocation.require_write().await?;

    let event = invocation.event;
    let package = match package {
        Some(package) => package.to_string(),
        None => {
            invocation
                .heuristics
                .guess_component_update(&event.issue_title, &event.issue_body)?
                .package
        }
    };

    // The comment event does not carry the PR head.
    let pull = invocation.pull_request().await?;

    invocation.acknowledge().await?;

    let request = DeployRequest {
        package,
        head_sha: pull.head_sha,
        title: event.issue_title.clone(),
        actor: event.commenter.clone(),
    };
    let updated = crate::cascade::deploy(
        invocation.github,
        invocation.config,
        &event.repo,
        &request,
        &invocation.tracking_comment(),
    )
    .await?;
    Ok(format!("I edited the comment: {}", updated.html_url))
}
