//! GitHub effect interpreter using octocrab.
//!
//! This module implements the `GitHubInterpreter` trait, executing GitHub effects
//! against the real GitHub API via octocrab.
//!
//! Key implementation details:
//! - Raw REST routes with local serde types, so only the fields the pipelines
//!   read have to be present
//! - GraphQL for collaborator permissions
//! - `filter=all` when listing check runs: the default only returns the most
//!   recent run per name, which hides earlier attempts from the correlator
//! - Retry logic with exponential backoff for transient errors

use chrono::{DateTime, SecondsFormat, Utc};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};

use crate::effects::{
    CheckRunUpdate, CommentData, GitHubEffect, GitHubInterpreter, GitHubResponse, NewCheckRun,
    Permission, PullRequestData, Reaction, SearchHit, TextMatch, WorkflowInputs, WorkflowRunData,
};
use crate::types::{
    CheckRunId, CheckRunStatus, CommentId, Conclusion, IssueNumber, RepoId, Sha, StageOutput,
    StageRecord, WorkflowRunId,
};

use super::client::InstallationClient;
use super::error::GitHubApiError;
use super::retry::{RetryPolicy, retry_with_backoff};

const PER_PAGE: u8 = 100;

// ─── GraphQL Types ────────────────────────────────────────────────────────────

const COLLABORATOR_PERMISSION_QUERY: &str = r#"
query($owner: String!, $repo: String!, $login: String!) {
    repository(owner: $owner, name: $repo) {
        collaborators(query: $login, first: 10) {
            edges {
                permission
                node { login }
            }
        }
    }
}
"#;

#[derive(Debug, Deserialize)]
struct PermissionQueryResponse {
    data: Option<PermissionQueryData>,
}

#[derive(Debug, Deserialize)]
struct PermissionQueryData {
    repository: Option<PermissionRepository>,
}

#[derive(Debug, Deserialize)]
struct PermissionRepository {
    collaborators: Option<CollaboratorConnection>,
}

#[derive(Debug, Deserialize)]
struct CollaboratorConnection {
    edges: Vec<CollaboratorEdge>,
}

#[derive(Debug, Deserialize)]
struct CollaboratorEdge {
    permission: Permission,
    node: CollaboratorNode,
}

#[derive(Debug, Deserialize)]
struct CollaboratorNode {
    login: String,
}

// ─── REST Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
    html_url: String,
    body: Option<String>,
    issue_url: Option<String>,
}

impl RawComment {
    fn into_data(self) -> CommentData {
        let issue = self
            .issue_url
            .as_deref()
            .and_then(|url| url.rsplit('/').next())
            .and_then(|n| n.parse().ok())
            .map(IssueNumber);
        CommentData {
            id: CommentId(self.id),
            html_url: self.html_url,
            body: self.body.unwrap_or_default(),
            issue,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    title: String,
    head: RawRef,
    base: RawRef,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    sha: String,
    #[serde(rename = "ref")]
    ref_field: String,
}

#[derive(Debug, Deserialize)]
struct RawCheckRunList {
    check_runs: Vec<RawCheckRun>,
}

#[derive(Debug, Deserialize)]
struct RawCheckRun {
    id: u64,
    name: String,
    head_sha: String,
    status: CheckRunStatus,
    conclusion: Option<Conclusion>,
    html_url: Option<String>,
    details_url: Option<String>,
    #[serde(default)]
    output: StageOutput,
}

impl RawCheckRun {
    fn into_record(self) -> StageRecord {
        StageRecord {
            id: CheckRunId(self.id),
            name: self.name,
            head_sha: Sha::new(self.head_sha),
            status: self.status,
            conclusion: self.conclusion,
            html_url: self.html_url.unwrap_or_default(),
            details_url: self.details_url,
            output: self.output,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawWorkflowRunList {
    workflow_runs: Vec<RawWorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct RawWorkflowRun {
    id: u64,
    html_url: String,
    created_at: DateTime<Utc>,
    status: Option<String>,
    conclusion: Option<String>,
}

impl RawWorkflowRun {
    fn into_data(self) -> WorkflowRunData {
        WorkflowRunData {
            id: WorkflowRunId(self.id),
            html_url: self.html_url,
            created_at: self.created_at,
            status: self.status,
            conclusion: self.conclusion,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSearchResults {
    items: Vec<RawSearchItem>,
}

#[derive(Debug, Deserialize)]
struct RawSearchItem {
    number: u64,
    title: String,
    html_url: String,
    #[serde(default)]
    text_matches: Vec<RawTextMatch>,
}

#[derive(Debug, Deserialize)]
struct RawTextMatch {
    object_url: String,
    object_type: Option<String>,
    #[serde(default)]
    fragment: String,
}

#[derive(Debug, Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

// ─── Interpreter Implementation ───────────────────────────────────────────────

impl GitHubInterpreter for InstallationClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        let client = self.client().await?;
        let policy = retry_policy_for(self.retry_policy(), &effect);
        retry_with_backoff(self.retry_config(), policy, effect.name(), || {
            execute_effect(client, effect.clone())
        })
        .await
    }
}

/// Effects that must not happen twice are attempted once.
fn retry_policy_for(configured: RetryPolicy, effect: &GitHubEffect) -> RetryPolicy {
    if effect.is_idempotent() {
        configured
    } else {
        RetryPolicy::NoRetry
    }
}

/// Executes a single effect without retry logic.
async fn execute_effect(
    client: &Octocrab,
    effect: GitHubEffect,
) -> Result<GitHubResponse, GitHubApiError> {
    match effect {
        GitHubEffect::GetComment { repo, comment_id } => {
            get_comment(client, &repo, comment_id).await
        }
        GitHubEffect::CreateComment { repo, issue, body } => {
            create_comment(client, &repo, issue, body).await
        }
        GitHubEffect::UpdateComment {
            repo,
            comment_id,
            body,
        } => update_comment(client, &repo, comment_id, body).await,
        GitHubEffect::ListComments { repo, issue } => list_comments(client, &repo, issue).await,
        GitHubEffect::AddReaction {
            repo,
            comment_id,
            reaction,
        } => add_reaction(client, &repo, comment_id, reaction).await,
        GitHubEffect::GetPullRequest { repo, number } => {
            get_pull_request(client, &repo, number).await
        }
        GitHubEffect::GetCollaboratorPermission { repo, login } => {
            get_collaborator_permission(client, &repo, &login).await
        }
        GitHubEffect::ListCheckRuns {
            repo,
            head_sha,
            name,
        } => list_check_runs(client, &repo, &head_sha, &name).await,
        GitHubEffect::CreateCheckRun { repo, check_run } => {
            create_check_run(client, &repo, check_run).await
        }
        GitHubEffect::UpdateCheckRun { repo, id, update } => {
            update_check_run(client, &repo, id, update).await
        }
        GitHubEffect::DispatchWorkflow {
            repo,
            workflow,
            git_ref,
            inputs,
        } => dispatch_workflow(client, &repo, &workflow, &git_ref, inputs).await,
        GitHubEffect::ListDispatchedRuns {
            repo,
            workflow,
            since,
        } => list_dispatched_runs(client, &repo, &workflow, since).await,
        GitHubEffect::GetWorkflowRun { repo, run_id } => {
            get_workflow_run(client, &repo, run_id).await
        }
        GitHubEffect::SearchIssues { query } => search_issues(client, &query).await,
    }
}

// ─── Comments ─────────────────────────────────────────────────────────────────

async fn get_comment(
    client: &Octocrab,
    repo: &RepoId,
    comment_id: CommentId,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/issues/comments/{}",
        repo.owner, repo.repo, comment_id
    );
    let comment: RawComment = client.get(&url, None::<&()>).await?;
    Ok(GitHubResponse::Comment(comment.into_data()))
}

async fn create_comment(
    client: &Octocrab,
    repo: &RepoId,
    issue: IssueNumber,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/issues/{}/comments",
        repo.owner, repo.repo, issue.0
    );

    #[derive(Serialize)]
    struct CommentRequest {
        body: String,
    }

    let comment: RawComment = client.post(&url, Some(&CommentRequest { body })).await?;
    Ok(GitHubResponse::Comment(comment.into_data()))
}

async fn update_comment(
    client: &Octocrab,
    repo: &RepoId,
    comment_id: CommentId,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/issues/comments/{}",
        repo.owner, repo.repo, comment_id
    );

    #[derive(Serialize)]
    struct UpdateRequest {
        body: String,
    }

    let comment: RawComment = client.patch(&url, Some(&UpdateRequest { body })).await?;
    Ok(GitHubResponse::Comment(comment.into_data()))
}

async fn list_comments(
    client: &Octocrab,
    repo: &RepoId,
    issue: IssueNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/issues/{}/comments",
        repo.owner, repo.repo, issue.0
    );
    let mut page = 1u32;
    let mut all_comments = Vec::new();

    loop {
        let params = PageParams {
            per_page: PER_PAGE,
            page,
        };
        let items: Vec<RawComment> = client.get(&url, Some(&params)).await?;
        let is_last_page = items.len() < PER_PAGE as usize;
        all_comments.extend(items.into_iter().map(RawComment::into_data));

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(GitHubResponse::Comments(all_comments))
}

async fn add_reaction(
    client: &Octocrab,
    repo: &RepoId,
    comment_id: CommentId,
    reaction: Reaction,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/issues/comments/{}/reactions",
        repo.owner, repo.repo, comment_id
    );

    #[derive(Serialize)]
    struct ReactionRequest {
        content: &'static str,
    }

    let _: serde_json::Value = client
        .post(
            &url,
            Some(&ReactionRequest {
                content: reaction.as_api_str(),
            }),
        )
        .await?;
    Ok(GitHubResponse::ReactionAdded)
}

// ─── Pull Requests & Permissions ──────────────────────────────────────────────

async fn get_pull_request(
    client: &Octocrab,
    repo: &RepoId,
    number: IssueNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.repo, number.0);
    let pull: RawPullRequest = client.get(&url, None::<&()>).await?;
    Ok(GitHubResponse::PullRequest(PullRequestData {
        number: IssueNumber(pull.number),
        title: pull.title,
        head_sha: Sha::new(pull.head.sha),
        base_ref: pull.base.ref_field,
    }))
}

async fn get_collaborator_permission(
    client: &Octocrab,
    repo: &RepoId,
    login: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let response: PermissionQueryResponse = client
        .graphql(&serde_json::json!({
            "query": COLLABORATOR_PERMISSION_QUERY,
            "variables": {
                "owner": repo.owner,
                "repo": repo.repo,
                "login": login,
            }
        }))
        .await?;

    // `collaborators(query:)` matches substrings, so pick the exact login.
    let permission = response
        .data
        .and_then(|d| d.repository)
        .and_then(|r| r.collaborators)
        .and_then(|c| {
            c.edges
                .into_iter()
                .find(|e| e.node.login.eq_ignore_ascii_case(login))
        })
        .map(|e| e.permission);

    Ok(GitHubResponse::Permission(permission))
}

// ─── Check Runs ───────────────────────────────────────────────────────────────

async fn list_check_runs(
    client: &Octocrab,
    repo: &RepoId,
    head_sha: &Sha,
    name: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/commits/{}/check-runs",
        repo.owner, repo.repo, head_sha
    );

    #[derive(Serialize)]
    struct ListParams<'a> {
        check_name: &'a str,
        filter: &'static str,
        per_page: u8,
        page: u32,
    }

    let mut page = 1u32;
    let mut records = Vec::new();
    loop {
        let params = ListParams {
            check_name: name,
            filter: "all",
            per_page: PER_PAGE,
            page,
        };
        let list: RawCheckRunList = client.get(&url, Some(&params)).await?;
        let is_last_page = list.check_runs.len() < PER_PAGE as usize;
        records.extend(list.check_runs.into_iter().map(RawCheckRun::into_record));

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(GitHubResponse::CheckRuns(records))
}

/// Builds the `output` object, omitting unset fields.
fn output_json(output: &StageOutput) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("title".into(), output.title().into());
    map.insert("summary".into(), output.summary().into());
    if let Some(text) = &output.text {
        map.insert("text".into(), text.clone().into());
    }
    serde_json::Value::Object(map)
}

async fn create_check_run(
    client: &Octocrab,
    repo: &RepoId,
    check_run: NewCheckRun,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/repos/{}/{}/check-runs", repo.owner, repo.repo);
    let body = serde_json::json!({
        "name": check_run.name,
        "head_sha": check_run.head_sha,
        "status": check_run.status.as_api_str(),
        "output": output_json(&check_run.output),
    });
    let created: RawCheckRun = client.post(&url, Some(&body)).await?;
    Ok(GitHubResponse::CheckRun(created.into_record()))
}

async fn update_check_run(
    client: &Octocrab,
    repo: &RepoId,
    id: CheckRunId,
    update: CheckRunUpdate,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/repos/{}/{}/check-runs/{}", repo.owner, repo.repo, id);

    let mut body = serde_json::Map::new();
    if let Some(status) = update.status {
        body.insert("status".into(), status.as_api_str().into());
    }
    if let Some(conclusion) = update.conclusion {
        body.insert("conclusion".into(), conclusion.as_api_str().into());
    }
    if let Some(details_url) = update.details_url {
        body.insert("details_url".into(), details_url.into());
    }
    if let Some(output) = &update.output {
        body.insert("output".into(), output_json(output));
    }

    let updated: RawCheckRun = client
        .patch(&url, Some(&serde_json::Value::Object(body)))
        .await?;
    Ok(GitHubResponse::CheckRun(updated.into_record()))
}

// ─── Workflows ────────────────────────────────────────────────────────────────

async fn dispatch_workflow(
    client: &Octocrab,
    repo: &RepoId,
    workflow: &str,
    git_ref: &str,
    inputs: WorkflowInputs,
) -> Result<GitHubResponse, GitHubApiError> {
    let inputs = serde_json::to_value(inputs).map_err(|e| {
        GitHubApiError::permanent_without_source(format!("unserializable inputs: {}", e))
    })?;
    client
        .actions()
        .create_workflow_dispatch(&repo.owner, &repo.repo, workflow, git_ref)
        .inputs(inputs)
        .send()
        .await?;
    Ok(GitHubResponse::WorkflowDispatched)
}

async fn list_dispatched_runs(
    client: &Octocrab,
    repo: &RepoId,
    workflow: &str,
    since: DateTime<Utc>,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/actions/workflows/{}/runs",
        repo.owner,
        repo.repo,
        urlencoding::encode(workflow)
    );

    #[derive(Serialize)]
    struct RunParams {
        event: &'static str,
        created: String,
        per_page: u8,
    }

    let params = RunParams {
        event: "workflow_dispatch",
        created: format!(">={}", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
        per_page: PER_PAGE,
    };
    let list: RawWorkflowRunList = client.get(&url, Some(&params)).await?;
    Ok(GitHubResponse::WorkflowRuns(
        list.workflow_runs
            .into_iter()
            .map(RawWorkflowRun::into_data)
            .collect(),
    ))
}

async fn get_workflow_run(
    client: &Octocrab,
    repo: &RepoId,
    run_id: WorkflowRunId,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/actions/runs/{}",
        repo.owner, repo.repo, run_id
    );
    let run: RawWorkflowRun = client.get(&url, None::<&()>).await?;
    Ok(GitHubResponse::WorkflowRun(run.into_data()))
}

// ─── Search ───────────────────────────────────────────────────────────────────

async fn search_issues(client: &Octocrab, query: &str) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct SearchParams<'a> {
        q: &'a str,
        per_page: u8,
    }

    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::ACCEPT,
        http::HeaderValue::from_static("application/vnd.github.text-match+json"),
    );

    let results: RawSearchResults = client
        .get_with_headers(
            "/search/issues",
            Some(&SearchParams {
                q: query,
                per_page: PER_PAGE,
            }),
            Some(headers),
        )
        .await?;

    Ok(GitHubResponse::SearchResults(
        results
            .items
            .into_iter()
            .map(|item| SearchHit {
                number: IssueNumber(item.number),
                title: item.title,
                html_url: item.html_url,
                text_matches: item
                    .text_matches
                    .into_iter()
                    .map(|m| TextMatch {
                        object_url: m.object_url,
                        object_type: m.object_type,
                        fragment: m.fragment,
                    })
                    .collect(),
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_are_attempted_once() {
        let dispatch = GitHubEffect::DispatchWorkflow {
            repo: RepoId::new("git-for-windows", "git-for-windows-automation"),
            workflow: "tag-git.yml".to_string(),
            git_ref: "main".to_string(),
            inputs: Default::default(),
        };
        let listing = GitHubEffect::ListDispatchedRuns {
            repo: RepoId::new("git-for-windows", "git-for-windows-automation"),
            workflow: "tag-git.yml".to_string(),
            since: chrono::Utc::now(),
        };

        assert_eq!(
            retry_policy_for(RetryPolicy::RetryTransient, &dispatch),
            RetryPolicy::NoRetry
        );
        assert_eq!(
            retry_policy_for(RetryPolicy::RetryTransient, &listing),
            RetryPolicy::RetryTransient
        );
        assert_eq!(retry_policy_for(RetryPolicy::NoRetry, &listing), RetryPolicy::NoRetry);
    }

    #[test]
    fn comment_issue_number_comes_from_issue_url() {
        let raw: RawComment = serde_json::from_value(serde_json::json!({
            "id": 1487,
            "html_url": "https://github.com/git-for-windows/git/pull/4322#issuecomment-1487",
            "body": "/git-artifacts",
            "issue_url": "https://api.github.com/repos/git-for-windows/git/issues/4322"
        }))
        .unwrap();
        let data = raw.into_data();
        assert_eq!(data.issue, Some(IssueNumber(4322)));
        assert_eq!(data.body, "/git-artifacts");
    }

    #[test]
    fn check_run_listing_tolerates_missing_output_fields() {
        let raw: RawCheckRunList = serde_json::from_value(serde_json::json!({
            "total_count": 1,
            "check_runs": [{
                "id": 45,
                "name": "tag-git",
                "head_sha": "c8edb521bdabec14b07e9142e48cab77a40ba339",
                "status": "completed",
                "conclusion": "success",
                "html_url": "https://github.com/git-for-windows/git/runs/45",
                "details_url": "https://github.com/git-for-windows/git-for-windows-automation/actions/runs/341",
                "output": { "title": "Tag Git v2.40.0 @c8edb52", "summary": null }
            }]
        }))
        .unwrap();
        let record = raw.check_runs.into_iter().next().unwrap().into_record();
        assert!(record.is_successful());
        assert_eq!(record.output.summary(), "");
        assert_eq!(record.output.text, None);
    }

    #[test]
    fn output_json_omits_missing_text() {
        let json = output_json(&StageOutput::new("t", "s"));
        assert_eq!(json, serde_json::json!({ "title": "t", "summary": "s" }));
        let json = output_json(&StageOutput::new("t", "s").with_text("x"));
        assert_eq!(json["text"], "x");
    }

    #[test]
    fn permission_picks_exact_login() {
        let response: PermissionQueryResponse = serde_json::from_value(serde_json::json!({
            "data": { "repository": { "collaborators": { "edges": [
                { "permission": "READ", "node": { "login": "dscho-bot" } },
                { "permission": "ADMIN", "node": { "login": "dscho" } }
            ]}}}
        }))
        .unwrap();
        let edges = response.data.unwrap().repository.unwrap().collaborators.unwrap().edges;
        let found = edges.into_iter().find(|e| e.node.login == "dscho").unwrap();
        assert_eq!(found.permission, Permission::Admin);
    }
}
