//! `/add relnote`.

use tracing::{info, warn};

use crate::accessors::dispatch_workflow;
use crate::cascade::{workflow_inputs, workflows};
use crate::commands::ExplicitNote;
use crate::components::ComponentHeuristics;
use crate::effects::GitHubInterpreter;
use crate::error::PipelineError;
use crate::wire::format;

use super::Invocation;

/// The release notes live in `build-extra`, whose workflows run on `main`.
const RELEASE_NOTES_REPO: &str = "build-extra";
const RELEASE_NOTES_REF: &str = "main";

/// Adds an explicit note, or one guessed from the issue.
///
/// A guessed note for a component update is refused while any of its
/// packages has not been deployed yet; the missing ones are listed in the
/// tracking comment.
pub(super) async fn add_release_note<G: GitHubInterpreter, H: ComponentHeuristics>(
    invocation: &Invocation<'_, G, H>,
    explicit: Option<&ExplicitNote>,
) -> Result<String, PipelineError> {
    invocation.require_write().await?;

    let event = invocation.event;
    let (kind, message) = match explicit {
        Some(note) => (note.kind, note.message.clone()),
        None => {
            let guessed = invocation
                .heuristics
                .guess_release_note(&event.issue_title, &event.issue_body)?;
            if let Some(update) = &guessed.update {
                let missing = invocation.heuristics.missing_deployments(update).await?;
                if !missing.is_empty() {
                    warn!(package = %update.package, ?missing, "release note before deployment");
                    invocation
                        .tracking_comment()
                        .append(invocation.github, &format::missing_deployments(&missing))
                        .await?;
                    return Err(PipelineError::MissingDeployments(missing));
                }
            }
            (guessed.kind, guessed.message)
        }
    };

    invocation.acknowledge().await?;

    info!(kind = kind.as_str(), "adding release note");
    let run = dispatch_workflow(
        invocation.github,
        &invocation.config.org_repo(RELEASE_NOTES_REPO),
        workflows::ADD_RELEASE_NOTE,
        RELEASE_NOTES_REF,
        workflow_inputs([
            ("type", kind.as_str().into()),
            ("message", message.into()),
        ]),
        invocation.config.dispatch_polling,
    )
    .await?;

    invocation
        .report(&format::workflow_started(&run.html_url))
        .await
}
