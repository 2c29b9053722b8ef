//! Shared test utilities: an in-memory GitHub and webhook payload fixtures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::effects::{
    CommentData, GitHubEffect, GitHubInterpreter, GitHubResponse, NewCheckRun, Permission,
    PullRequestData, Reaction, SearchHit, WorkflowInputs, WorkflowRunData,
};
use crate::github::{GitHubApiError, Installations};
use crate::types::{
    CheckRunId, CheckRunStatus, CommentId, Conclusion, InstallationId, IssueNumber, RepoId, Sha,
    StageOutput, StageRecord, WorkflowRunId,
};

/// A dispatch as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDispatch {
    pub repo: RepoId,
    pub workflow: String,
    pub git_ref: String,
    pub inputs: WorkflowInputs,
    pub run_id: WorkflowRunId,
}

type DispatchFailure = dyn Fn(&str, &WorkflowInputs) -> bool + Send + Sync;
type CheckRunFailure = dyn Fn(&str) -> bool + Send + Sync;

struct FakeRun {
    repo: RepoId,
    workflow: Option<String>,
    data: WorkflowRunData,
    /// Listings left before the run shows up.
    hidden_for: u32,
}

#[derive(Default)]
struct World {
    next_id: u64,
    comments: Vec<(RepoId, CommentData)>,
    reactions: Vec<(CommentId, Reaction)>,
    pulls: Vec<(RepoId, PullRequestData)>,
    permissions: HashMap<String, Permission>,
    check_runs: Vec<(RepoId, StageRecord)>,
    created_check_runs: Vec<(RepoId, NewCheckRun)>,
    runs: Vec<FakeRun>,
    dispatches: Vec<RecordedDispatch>,
    search_hits: Vec<SearchHit>,
    dispatch_delay: u32,
    effects: Vec<GitHubEffect>,
}

impl World {
    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// An in-memory GitHub that applies effects and records them.
///
/// Clones share the same world, so a test can keep a handle while the code
/// under test owns another.
#[derive(Clone)]
pub struct MockGitHub {
    world: Arc<Mutex<World>>,
    failing_dispatch: Option<Arc<DispatchFailure>>,
    failing_check_run: Option<Arc<CheckRunFailure>>,
}

impl Default for MockGitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGitHub {
    pub fn new() -> Self {
        let world = World {
            // Above every id the tests hard-code.
            next_id: 10_000_000_000,
            ..Default::default()
        };
        MockGitHub {
            world: Arc::new(Mutex::new(world)),
            failing_dispatch: None,
            failing_check_run: None,
        }
    }

    /// Dispatched runs stay invisible for `listings` run listings.
    pub fn with_dispatch_delay(self, listings: u32) -> Self {
        self.world.lock().unwrap().dispatch_delay = listings;
        self
    }

    /// Rejects dispatches matching `predicate`.
    pub fn with_failing_dispatch(
        mut self,
        predicate: impl Fn(&str, &WorkflowInputs) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.failing_dispatch = Some(Arc::new(predicate));
        self
    }

    /// Rejects the creation of check runs whose name matches `predicate`.
    pub fn with_failing_check_run(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.failing_check_run = Some(Arc::new(predicate));
        self
    }

    // ─── Seeding ──────────────────────────────────────────────────────────────

    pub fn add_comment(&self, repo: &RepoId, issue: IssueNumber, body: &str) -> CommentId {
        let mut world = self.world.lock().unwrap();
        let id = CommentId(world.fresh_id());
        world
            .comments
            .push((repo.clone(), comment_data(repo, issue, id, body)));
        id
    }

    pub fn add_comment_with_id(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
        id: CommentId,
        body: &str,
    ) {
        self.world
            .lock()
            .unwrap()
            .comments
            .push((repo.clone(), comment_data(repo, issue, id, body)));
    }

    pub fn set_comment_body(&self, id: CommentId, body: &str) {
        let mut world = self.world.lock().unwrap();
        if let Some((_, comment)) = world.comments.iter_mut().find(|(_, c)| c.id == id) {
            comment.body = body.to_string();
        }
    }

    pub fn add_pull_request(
        &self,
        repo: &RepoId,
        number: u64,
        title: &str,
        head_sha: &str,
        base_ref: &str,
    ) {
        self.world.lock().unwrap().pulls.push((
            repo.clone(),
            PullRequestData {
                number: IssueNumber(number),
                title: title.to_string(),
                head_sha: Sha::new(head_sha),
                base_ref: base_ref.to_string(),
            },
        ));
    }

    pub fn grant(&self, login: &str, permission: Permission) {
        self.world
            .lock()
            .unwrap()
            .permissions
            .insert(login.to_string(), permission);
    }

    pub fn add_check_run(&self, repo: &RepoId, record: StageRecord) {
        self.world
            .lock()
            .unwrap()
            .check_runs
            .push((repo.clone(), record));
    }

    /// A workflow run that exists but was not dispatched by the code under test.
    pub fn add_workflow_run(&self, repo: &RepoId, run_id: WorkflowRunId) {
        self.world.lock().unwrap().runs.push(FakeRun {
            repo: repo.clone(),
            workflow: None,
            data: run_data(repo, run_id),
            hidden_for: 0,
        });
    }

    pub fn add_search_hit(&self, hit: SearchHit) {
        self.world.lock().unwrap().search_hits.push(hit);
    }

    // ─── Inspection ───────────────────────────────────────────────────────────

    pub fn effects(&self) -> Vec<GitHubEffect> {
        self.world.lock().unwrap().effects.clone()
    }

    pub fn dispatches(&self) -> Vec<RecordedDispatch> {
        self.world.lock().unwrap().dispatches.clone()
    }

    /// Workflow file names, in dispatch order.
    pub fn dispatched_workflows(&self) -> Vec<String> {
        self.dispatches().into_iter().map(|d| d.workflow).collect()
    }

    pub fn created_check_runs(&self) -> Vec<(RepoId, NewCheckRun)> {
        self.world.lock().unwrap().created_check_runs.clone()
    }

    pub fn check_run(&self, id: CheckRunId) -> Option<StageRecord> {
        self.world
            .lock()
            .unwrap()
            .check_runs
            .iter()
            .find(|(_, r)| r.id == id)
            .map(|(_, r)| r.clone())
    }

    pub fn comment_body(&self, id: CommentId) -> Option<String> {
        self.world
            .lock()
            .unwrap()
            .comments
            .iter()
            .find(|(_, c)| c.id == id)
            .map(|(_, c)| c.body.clone())
    }

    pub fn comments_on(&self, repo: &RepoId, issue: IssueNumber) -> Vec<CommentData> {
        self.world
            .lock()
            .unwrap()
            .comments
            .iter()
            .filter(|(r, c)| r == repo && c.issue == Some(issue))
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn reactions(&self) -> Vec<(CommentId, Reaction)> {
        self.world.lock().unwrap().reactions.clone()
    }

    // ─── Effect application ───────────────────────────────────────────────────

    fn apply(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        let mut world = self.world.lock().unwrap();
        world.effects.push(effect.clone());

        match effect {
            GitHubEffect::GetComment { repo, comment_id } => world
                .comments
                .iter()
                .find(|(r, c)| *r == repo && c.id == comment_id)
                .map(|(_, c)| GitHubResponse::Comment(c.clone()))
                .ok_or_else(|| GitHubApiError::not_found(format!("comment {}", comment_id))),

            GitHubEffect::CreateComment { repo, issue, body } => {
                let id = CommentId(world.fresh_id());
                let comment = comment_data(&repo, issue, id, &body);
                world.comments.push((repo, comment.clone()));
                Ok(GitHubResponse::Comment(comment))
            }

            GitHubEffect::UpdateComment {
                repo,
                comment_id,
                body,
            } => world
                .comments
                .iter_mut()
                .find(|(r, c)| *r == repo && c.id == comment_id)
                .map(|(_, c)| {
                    c.body = body;
                    GitHubResponse::Comment(c.clone())
                })
                .ok_or_else(|| GitHubApiError::not_found(format!("comment {}", comment_id))),

            GitHubEffect::ListComments { repo, issue } => Ok(GitHubResponse::Comments(
                world
                    .comments
                    .iter()
                    .filter(|(r, c)| *r == repo && c.issue == Some(issue))
                    .map(|(_, c)| c.clone())
                    .collect(),
            )),

            GitHubEffect::AddReaction {
                comment_id,
                reaction,
                ..
            } => {
                world.reactions.push((comment_id, reaction));
                Ok(GitHubResponse::ReactionAdded)
            }

            GitHubEffect::GetPullRequest { repo, number } => world
                .pulls
                .iter()
                .find(|(r, p)| *r == repo && p.number == number)
                .map(|(_, p)| GitHubResponse::PullRequest(p.clone()))
                .ok_or_else(|| GitHubApiError::not_found(format!("pull request {}", number))),

            GitHubEffect::GetCollaboratorPermission { login, .. } => Ok(
                GitHubResponse::Permission(world.permissions.get(&login).copied()),
            ),

            GitHubEffect::ListCheckRuns {
                repo,
                head_sha,
                name,
            } => Ok(GitHubResponse::CheckRuns(
                world
                    .check_runs
                    .iter()
                    .filter(|(r, c)| *r == repo && c.head_sha == head_sha && c.name == name)
                    .map(|(_, c)| c.clone())
                    .collect(),
            )),

            GitHubEffect::CreateCheckRun { repo, check_run } => {
                if let Some(failing) = &self.failing_check_run
                    && (failing.as_ref())(&check_run.name)
                {
                    return Err(GitHubApiError::transient_without_source(format!(
                        "creating check run {} failed",
                        check_run.name
                    )));
                }
                let id = CheckRunId(world.fresh_id());
                let record = StageRecord {
                    id,
                    name: check_run.name.clone(),
                    head_sha: check_run.head_sha.clone(),
                    status: check_run.status,
                    conclusion: None,
                    html_url: format!("https://github.com/{}/runs/{}", repo, id),
                    details_url: None,
                    output: check_run.output.clone(),
                };
                world.created_check_runs.push((repo.clone(), check_run));
                world.check_runs.push((repo, record.clone()));
                Ok(GitHubResponse::CheckRun(record))
            }

            GitHubEffect::UpdateCheckRun { repo, id, update } => world
                .check_runs
                .iter_mut()
                .find(|(r, c)| *r == repo && c.id == id)
                .map(|(_, c)| {
                    if let Some(status) = update.status {
                        c.status = status;
                    }
                    if let Some(conclusion) = update.conclusion {
                        c.conclusion = Some(conclusion);
                    }
                    if let Some(url) = update.details_url {
                        c.details_url = Some(url);
                    }
                    if let Some(output) = update.output {
                        c.output = output;
                    }
                    GitHubResponse::CheckRun(c.clone())
                })
                .ok_or_else(|| GitHubApiError::not_found(format!("check run {}", id))),

            GitHubEffect::DispatchWorkflow {
                repo,
                workflow,
                git_ref,
                inputs,
            } => {
                if let Some(failing) = &self.failing_dispatch
                    && (failing.as_ref())(&workflow, &inputs)
                {
                    return Err(GitHubApiError::permanent_without_source(format!(
                        "dispatch of {} rejected",
                        workflow
                    )));
                }
                let run_id = WorkflowRunId(world.fresh_id());
                let hidden_for = world.dispatch_delay;
                world.runs.push(FakeRun {
                    repo: repo.clone(),
                    workflow: Some(workflow.clone()),
                    data: run_data(&repo, run_id),
                    hidden_for,
                });
                world.dispatches.push(RecordedDispatch {
                    repo,
                    workflow,
                    git_ref,
                    inputs,
                    run_id,
                });
                Ok(GitHubResponse::WorkflowDispatched)
            }

            GitHubEffect::ListDispatchedRuns {
                repo,
                workflow,
                since,
            } => {
                let mut visible = Vec::new();
                for run in world.runs.iter_mut().filter(|run| {
                    run.repo == repo && run.workflow.as_deref() == Some(workflow.as_str())
                }) {
                    if run.hidden_for > 0 {
                        run.hidden_for -= 1;
                    } else if run.data.created_at >= since {
                        visible.push(run.data.clone());
                    }
                }
                Ok(GitHubResponse::WorkflowRuns(visible))
            }

            GitHubEffect::GetWorkflowRun { repo, run_id } => world
                .runs
                .iter()
                .find(|run| run.repo == repo && run.data.id == run_id)
                .map(|run| GitHubResponse::WorkflowRun(run.data.clone()))
                .ok_or_else(|| GitHubApiError::not_found(format!("workflow run {}", run_id))),

            GitHubEffect::SearchIssues { .. } => {
                Ok(GitHubResponse::SearchResults(world.search_hits.clone()))
            }
        }
    }
}

impl GitHubInterpreter for MockGitHub {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        self.apply(effect)
    }
}

impl Installations for MockGitHub {
    type Client = MockGitHub;

    fn client_for(&self, _installation: InstallationId) -> MockGitHub {
        self.clone()
    }
}

fn comment_data(repo: &RepoId, issue: IssueNumber, id: CommentId, body: &str) -> CommentData {
    CommentData {
        id,
        html_url: format!(
            "https://github.com/{}/issues/{}#issuecomment-{}",
            repo, issue.0, id
        ),
        body: body.to_string(),
        issue: Some(issue),
    }
}

fn run_data(repo: &RepoId, run_id: WorkflowRunId) -> WorkflowRunData {
    WorkflowRunData {
        id: run_id,
        html_url: format!("https://github.com/{}/actions/runs/{}", repo, run_id),
        created_at: Utc::now(),
        status: Some("queued".to_string()),
        conclusion: None,
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

/// A completed, successful check run.
pub fn successful_stage(id: u64, name: &str, head_sha: &str, output: StageOutput) -> StageRecord {
    StageRecord {
        id: CheckRunId(id),
        name: name.to_string(),
        head_sha: Sha::new(head_sha),
        status: CheckRunStatus::Completed,
        conclusion: Some(Conclusion::Success),
        html_url: format!("https://github.com/git-for-windows/git/runs/{}", id),
        details_url: None,
        output,
    }
}

/// An `issue_comment` webhook payload. `on_pull_request` adds the
/// `issue.pull_request` marker GitHub sets for PR comments.
pub fn issue_comment_payload(
    repo: &RepoId,
    issue: u64,
    on_pull_request: bool,
    comment_id: u64,
    body: &str,
    login: &str,
) -> serde_json::Value {
    let mut issue_json = serde_json::json!({
        "number": issue,
        "title": "Some issue",
        "html_url": format!("https://github.com/{}/issues/{}", repo, issue),
    });
    if on_pull_request {
        issue_json["pull_request"] = serde_json::json!({
            "url": format!("https://api.github.com/repos/{}/pulls/{}", repo, issue),
        });
    }
    serde_json::json!({
        "action": "created",
        "comment": {
            "id": comment_id,
            "body": body,
            "html_url": format!("https://github.com/{}/issues/{}#issuecomment-{}", repo, issue, comment_id),
            "user": { "login": login },
        },
        "issue": issue_json,
        "repository": {
            "name": repo.repo,
            "owner": { "login": repo.owner },
        },
        "installation": { "id": 123 },
    })
}

/// A `check_run` webhook payload for a completed run.
pub fn check_run_payload(
    repo: &RepoId,
    name: &str,
    head_sha: &str,
    conclusion: &str,
    text: &str,
) -> serde_json::Value {
    serde_json::json!({
        "action": "completed",
        "check_run": {
            "id": 4242,
            "name": name,
            "head_sha": head_sha,
            "status": "completed",
            "conclusion": conclusion,
            "html_url": format!("https://github.com/{}/runs/4242", repo),
            "details_url": null,
            "output": {
                "title": "Tag Git v2.40.0-rc1.windows.1 @c8edb521bdabec14b07e9142e48cab77a40ba339",
                "summary": "Tag Git v2.40.0-rc1.windows.1 @c8edb521bdabec14b07e9142e48cab77a40ba339",
                "text": text,
            },
        },
        "repository": {
            "name": repo.repo,
            "owner": { "login": repo.owner },
        },
        "installation": { "id": 123 },
    })
}
