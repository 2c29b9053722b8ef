//! Command Router.
//!
//! Turns a `comment created` event into one pipeline run:
//!
//! 1. The comment body is parsed as a slash command.
//! 2. Commands are only honoured where they make sense; anything else is
//!    answered with an "Ignoring ..." status and no side effect.
//! 3. The commenter must have write access (except for `/hi`).
//! 4. A `+1` reaction acknowledges the command before anything is mutated.
//! 5. The handler reports into the triggering comment.
//!
//! A failure after the command was recognized earns the comment a
//! `confused` reaction, and the error is passed on to the caller.

mod git;
mod packages;
mod release_notes;

use tracing::{debug, info, warn};

use crate::accessors::{add_reaction, collaborator_permission, create_comment, get_pull_request};
use crate::cascade::TrackingComment;
use crate::commands::{Command, parse_command};
use crate::components::ComponentHeuristics;
use crate::config::BotConfig;
use crate::effects::{GitHubInterpreter, PullRequestData, Reaction};
use crate::error::PipelineError;
use crate::types::RepoId;
use crate::webhooks::IssueCommentEvent;
use crate::wire::format::ReleaseKind;

/// Package repositories that accept `/updpkgsums` and `/deploy`.
pub const PACKAGE_REPOS: &[&str] = &["build-extra", "MINGW-packages", "MSYS2-packages"];

/// Repositories that accept `/add relnote`.
pub const RELEASE_NOTE_REPOS: &[&str] = &["git", "build-extra", "MINGW-packages", "MSYS2-packages"];

/// Where a command may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eligibility {
    Anywhere,
    /// An issue or PR in one of these repositories of the active org.
    IssueIn(&'static [&'static str]),
    /// A PR in one of these repositories of the active org.
    PullRequestIn(&'static [&'static str]),
}

impl Eligibility {
    fn of(command: &Command) -> Self {
        match command {
            Command::Hi => Eligibility::Anywhere,
            Command::OpenPr => Eligibility::IssueIn(&["git"]),
            Command::UpdPkgSums | Command::Deploy { .. } => Eligibility::PullRequestIn(PACKAGE_REPOS),
            Command::GitArtifacts { .. }
            | Command::Release
            | Command::PrepareEmbargoedRelease
            | Command::PublishEmbargoedRelease => Eligibility::PullRequestIn(&["git"]),
            Command::AddReleaseNote { .. } => Eligibility::IssueIn(RELEASE_NOTE_REPOS),
        }
    }

    fn admits(&self, config: &BotConfig, event: &IssueCommentEvent) -> bool {
        let in_org = |repos: &[&str]| {
            event.repo.owner == config.active_org && repos.contains(&event.repo.repo.as_str())
        };
        match self {
            Eligibility::Anywhere => true,
            Eligibility::IssueIn(repos) => in_org(repos),
            Eligibility::PullRequestIn(repos) => event.is_pull_request && in_org(repos),
        }
    }
}

/// Everything one command invocation works with.
pub(crate) struct Invocation<'a, G, H> {
    pub github: &'a G,
    pub config: &'a BotConfig,
    pub heuristics: &'a H,
    pub event: &'a IssueCommentEvent,
}

impl<G: GitHubInterpreter, H: ComponentHeuristics> Invocation<'_, G, H> {
    fn repo(&self) -> &RepoId {
        &self.event.repo
    }

    /// The triggering comment, which doubles as the tracking comment.
    fn tracking_comment(&self) -> TrackingComment {
        TrackingComment::new(self.event.repo.clone(), self.event.comment_id)
    }

    async fn require_write(&self) -> Result<(), PipelineError> {
        let permission =
            collaborator_permission(self.github, self.repo(), &self.event.commenter).await?;
        match permission {
            Some(permission) if permission.can_write() => Ok(()),
            _ => Err(PipelineError::PermissionDenied(self.event.commenter.clone())),
        }
    }

    async fn acknowledge(&self) -> Result<(), PipelineError> {
        add_reaction(self.github, self.repo(), self.event.comment_id, Reaction::ThumbsUp).await
    }

    /// The PR the comment was made on.
    async fn pull_request(&self) -> Result<PullRequestData, PipelineError> {
        get_pull_request(self.github, self.repo(), self.event.issue).await
    }

    /// Appends `section` to the tracking comment; returns the status line.
    async fn report(&self, section: &str) -> Result<String, PipelineError> {
        let updated = self.tracking_comment().append(self.github, section).await?;
        Ok(format!("I edited the comment: {}", updated.html_url))
    }

    async fn say_hi(&self) -> Result<String, PipelineError> {
        let answer = create_comment(
            self.github,
            self.repo(),
            self.event.issue,
            format!("Hi @{}!", self.event.commenter),
        )
        .await?;
        Ok(format!("I said hi! {}", answer.html_url))
    }

    async fn run(&self, command: &Command) -> Result<String, PipelineError> {
        match command {
            Command::Hi => self.say_hi().await,
            Command::OpenPr => packages::open_pr(self).await,
            Command::UpdPkgSums => packages::updpkgsums(self).await,
            Command::Deploy { package } => packages::deploy(self, package.as_deref()).await,
            Command::GitArtifacts {
                mingit_only,
                release_date,
            } => git::git_artifacts(self, *mingit_only, release_date.clone()).await,
            Command::Release => git::release(self, ReleaseKind::Publish).await,
            Command::PrepareEmbargoedRelease => {
                git::release(self, ReleaseKind::PrepareEmbargoed).await
            }
            Command::PublishEmbargoedRelease => {
                git::release(self, ReleaseKind::PublishEmbargoed).await
            }
            Command::AddReleaseNote { note } => {
                release_notes::add_release_note(self, note.as_ref()).await
            }
        }
    }
}

/// Handles a newly created comment. Returns a status line for the caller.
pub async fn route_comment<G: GitHubInterpreter, H: ComponentHeuristics>(
    github: &G,
    config: &BotConfig,
    heuristics: &H,
    event: &IssueCommentEvent,
) -> Result<String, PipelineError> {
    let text = event.body.trim_end();
    if !text.starts_with('/') {
        debug!(repo = %event.repo, comment_id = %event.comment_id, "not a slash command");
        return Ok(format!("Ignoring comment {}", event.comment_url));
    }

    let Some(command) = parse_command(&event.body) else {
        debug!(repo = %event.repo, command = text, "unknown slash command");
        return Ok(format!("Ignoring slash command {} in {}", text, event.comment_url));
    };

    if !Eligibility::of(&command).admits(config, event) {
        debug!(repo = %event.repo, command = command.name(), issue = %event.issue, "command not eligible here");
        return Ok(format!("Ignoring {} in unexpected repo: {}", text, event.comment_url));
    }

    info!(
        command = command.name(),
        repo = %event.repo,
        issue = %event.issue,
        commenter = %event.commenter,
        "handling command"
    );

    let invocation = Invocation {
        github,
        config,
        heuristics,
        event,
    };
    let result = invocation.run(&command).await;

    if let Err(e) = &result {
        warn!(command = command.name(), repo = %event.repo, error = %e, "command failed");
        if let Err(reaction_error) =
            add_reaction(github, &event.repo, event.comment_id, Reaction::Confused).await
        {
            warn!(comment_id = %event.comment_id, error = %reaction_error, "could not add confused reaction");
        }
    }
    result
}


#[cfg(test)]
mod tests {
    use super::test_support::{COMMENT_ID, comment};
    use super::*;
    use crate::accessors::DispatchPolling;
    use crate::components::TitleHeuristics;
    use crate::effects::{GitHubEffect, Permission};
    use crate::test_utils::MockGitHub;
    use crate::types::CommentId;

    fn config() -> BotConfig {
        BotConfig::default().with_dispatch_polling(DispatchPolling::IMMEDIATE)
    }

    fn repo(name: &str) -> RepoId {
        RepoId::new("git-for-windows", name)
    }

    #[tokio::test]
    async fn hi_needs_no_permission() {
        let github = MockGitHub::new();
        let event = comment(&github, &RepoId::new("someone", "else"), 1, false, "Hello", "/hi");

        let status = route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap();

        let replies = github.comments_on(&event.repo, event.issue);
        let reply = replies.last().unwrap();
        assert_eq!(reply.body, "Hi @dscho!");
        assert_eq!(status, format!("I said hi! {}", reply.html_url));
        assert!(
            !github
                .effects()
                .iter()
                .any(|e| matches!(e, GitHubEffect::GetCollaboratorPermission { .. }))
        );
    }

    #[tokio::test]
    async fn ineligible_repository_is_ignored() {
        let github = MockGitHub::new();
        let event = comment(&github, &repo("MSYS2-packages"), 42, true, "bash: update", "/release");

        let status = route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap();

        assert_eq!(
            status,
            format!("Ignoring /release in unexpected repo: {}", event.comment_url)
        );
        assert_eq!(github.effects().len(), 0);
    }

    #[tokio::test]
    async fn deploy_on_an_issue_is_ignored() {
        let github = MockGitHub::new();
        let event = comment(&github, &repo("MSYS2-packages"), 42, false, "bash: update", "/deploy");

        let status = route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap();

        assert!(status.starts_with("Ignoring /deploy in unexpected repo"));
        assert!(github.effects().is_empty());
    }

    #[tokio::test]
    async fn other_organizations_are_ignored() {
        let github = MockGitHub::new();
        let event = comment(&github, &RepoId::new("fork", "git"), 1, true, "Rebase", "/git-artifacts");

        let status = route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap();

        assert!(status.starts_with("Ignoring /git-artifacts in unexpected repo"));
    }

    #[tokio::test]
    async fn active_org_is_configurable() {
        let github = MockGitHub::new();
        github.grant("dscho", Permission::Write);
        let config = BotConfig {
            active_org: "fork".to_string(),
            ..config()
        };
        let event = comment(&github, &RepoId::new("fork", "MSYS2-packages"), 3, true, "x", "/updpkgsums");

        route_comment(&github, &config, &TitleHeuristics, &event)
            .await
            .unwrap();

        let dispatches = github.dispatches();
        assert_eq!(dispatches[0].repo, RepoId::new("fork", "git-for-windows-automation"));
    }

    #[tokio::test]
    async fn unknown_slash_command_is_ignored() {
        let github = MockGitHub::new();
        let event = comment(&github, &repo("git"), 1, true, "Rebase", "/frobnicate  ");

        let status = route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap();

        assert_eq!(
            status,
            format!("Ignoring slash command /frobnicate in {}", event.comment_url)
        );
    }

    #[tokio::test]
    async fn plain_comments_are_ignored() {
        let github = MockGitHub::new();
        let event = comment(&github, &repo("git"), 1, true, "Rebase", "LGTM!");

        let status = route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap();

        assert!(status.starts_with("Ignoring comment"));
        assert!(github.effects().is_empty());
    }

    #[tokio::test]
    async fn missing_permission_earns_a_confused_reaction() {
        let github = MockGitHub::new();
        github.grant("dscho", Permission::Read);
        let event = comment(&github, &repo("MSYS2-packages"), 42, true, "bash: update to 5.2", "/deploy");

        let err = route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap_err();

        assert!(err.is_permission_denied());
        assert_eq!(err.to_string(), "@dscho has no permissions to do that");
        assert_eq!(github.reactions(), vec![(CommentId(COMMENT_ID), Reaction::Confused)]);
        assert!(github.dispatches().is_empty());
    }

    #[tokio::test]
    async fn non_collaborator_is_denied() {
        let github = MockGitHub::new();
        let event = comment(&github, &repo("git"), 4281, true, "Rebase", "/release");

        let err = route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap_err();

        assert!(err.is_permission_denied());
        assert!(github.created_check_runs().is_empty());
    }

    #[tokio::test]
    async fn permission_is_checked_before_acknowledging() {
        let github = MockGitHub::new();
        github.grant("dscho", Permission::Maintain);
        let event = comment(&github, &repo("MSYS2-packages"), 42, true, "x", "/updpkgsums");

        route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap();

        let effects = github.effects();
        let permission = effects
            .iter()
            .position(|e| matches!(e, GitHubEffect::GetCollaboratorPermission { .. }))
            .unwrap();
        let reaction = effects
            .iter()
            .position(|e| matches!(e, GitHubEffect::AddReaction { .. }))
            .unwrap();
        let dispatch = effects
            .iter()
            .position(|e| matches!(e, GitHubEffect::DispatchWorkflow { .. }))
            .unwrap();
        assert!(permission < reaction && reaction < dispatch);
    }

    #[tokio::test]
    async fn failure_after_acknowledgement_adds_confused() {
        let github = MockGitHub::new().with_failing_dispatch(|_, _| true);
        github.grant("dscho", Permission::Write);
        let event = comment(&github, &repo("MSYS2-packages"), 42, true, "x", "/updpkgsums");

        route_comment(&github, &config(), &TitleHeuristics, &event)
            .await
            .unwrap_err();

        assert_eq!(
            github.reactions(),
            vec![
                (CommentId(COMMENT_ID), Reaction::ThumbsUp),
                (CommentId(COMMENT_ID), Reaction::Confused)
            ]
        );
    }
}
