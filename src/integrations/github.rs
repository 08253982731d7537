//! GitHub Issues Integration Adapter
//!
//! Maps the scrum board vocabulary onto the GitHub REST API:
//!
//! - projects are repositories the user can access (`owner/name`)
//! - sprints are open milestones, the one due first being the active sprint
//! - issue keys have the form `owner/name#number`
//!
//! Works against github.com and GitHub Enterprise (`{url}/api/v3`).

use super::client::{ProviderClient, ProviderRequest, ProviderResponse, SEARCH_TIMEOUT};
use super::flag::flag_each;
use super::normalizer::IssueNormalizer;
use super::pagination::{collect_all, Page, PAGE_SIZE};
use super::search::{run_paged_search, SearchMode, SearchOutcome};
use super::{Authenticator, FilterResolver, FlagMutator, SearchEngine};
use crate::config::ProviderConfig;
use crate::error::{AuthError, MutationError, QueryError};
use crate::model::{
    Identity, IssueCollection, LoginAttempt, ProjectInventory, ProjectRef, SprintInventory,
    SprintRef, SprintState, Task,
};
use crate::{Result, ScrumboardError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// GitHub provider
pub struct GitHubProvider {
    client: Arc<dyn ProviderClient>,
    config: ProviderConfig,
    rest_base_url: String,
    normalizer: IssueNormalizer,
}

/// GitHub issue (REST API format)
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    /// Present when the "issue" is a pull request
    #[serde(default)]
    pub pull_request: Option<Value>,
    /// `{api}/repos/{owner}/{name}`, set on search results
    #[serde(default)]
    pub repository_url: Option<String>,
}

impl GitHubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Repository full name taken from `repository_url`
    fn repository(&self) -> Option<&str> {
        self.repository_url
            .as_deref()
            .and_then(|url| url.rsplit_once("/repos/"))
            .map(|(_, repo)| repo.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubUser {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubRepo {
    full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubMilestone {
    number: u64,
    title: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubSearchResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<GitHubIssue>,
}

/// `owner/name#12` → `("owner/name", 12)`
pub fn parse_issue_ref(key: &str) -> Option<(&str, u64)> {
    let (repo, number) = key.trim().split_once('#')?;
    Some((valid_repo(repo)?, number.parse().ok()?))
}

/// `owner/name:3` → `("owner/name", 3)`
pub fn parse_milestone_ref(id: &str) -> Option<(&str, u64)> {
    let (repo, number) = id.trim().rsplit_once(':')?;
    Some((valid_repo(repo)?, number.parse().ok()?))
}

fn valid_repo(repo: &str) -> Option<&str> {
    let (owner, name) = repo.split_once('/')?;
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    (valid(owner) && valid(name)).then_some(repo)
}

pub fn issue_key(repo: &str, number: u64) -> String {
    format!("{}#{}", repo, number)
}

/// REST API root for a GitHub or GitHub Enterprise base URL
fn rest_base_url(base_url: &str) -> String {
    if base_url.contains("github.com") && !base_url.contains("api.github.com") {
        "https://api.github.com".to_string()
    } else if base_url.contains("api.github.com") {
        base_url.to_string()
    } else {
        format!("{}/api/v3", base_url)
    }
}

fn page_number(start_at: u32) -> u32 {
    start_at / PAGE_SIZE + 1
}

impl GitHubProvider {
    pub fn new(config: ProviderConfig, client: Arc<dyn ProviderClient>) -> Self {
        let rest_base_url = rest_base_url(&config.base_url());
        let normalizer = IssueNormalizer::from_config(&config);

        Self {
            client,
            config,
            rest_base_url,
            normalizer,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn execute(
        &self,
        identity: &Identity,
        request: ProviderRequest,
    ) -> Result<ProviderResponse> {
        Ok(self.client.execute(identity.credential(), request).await?)
    }

    fn normalize(&self, repo: &str, issue: &GitHubIssue) -> Option<(String, Task)> {
        if issue.is_pull_request() {
            debug!(repo, number = issue.number, "Skipping pull request");
            return None;
        }
        Some((
            issue_key(repo, issue.number),
            self.normalizer.normalize_github(repo, issue),
        ))
    }

    async fn repo_page(&self, identity: &Identity, start_at: u32) -> Result<Page<ProjectRef>> {
        let url = format!(
            "{}/user/repos?sort=full_name&per_page={}&page={}",
            self.rest_base_url,
            PAGE_SIZE,
            page_number(start_at)
        );
        let repos: Vec<GitHubRepo> = self
            .execute(identity, ProviderRequest::get(url))
            .await?
            .json()?;
        Ok(Page::from_short_page(
            repos
                .into_iter()
                .map(|repo| ProjectRef::new(repo.full_name.clone(), repo.full_name))
                .collect(),
        ))
    }

    async fn milestone_page(
        &self,
        identity: &Identity,
        repo: &str,
        start_at: u32,
    ) -> Result<Page<GitHubMilestone>> {
        let url = format!(
            "{}/repos/{}/milestones?state=open&sort=due_on&direction=asc&per_page={}&page={}",
            self.rest_base_url,
            repo,
            PAGE_SIZE,
            page_number(start_at)
        );
        let milestones: Vec<GitHubMilestone> =
            self.execute(identity, ProviderRequest::get(url)).await?.json()?;
        Ok(Page::from_short_page(milestones))
    }

    async fn milestone_issue_page(
        &self,
        identity: &Identity,
        repo: &str,
        milestone: u64,
        start_at: u32,
    ) -> Result<Page<GitHubIssue>> {
        let url = format!(
            "{}/repos/{}/issues?milestone={}&state=open&per_page={}&page={}",
            self.rest_base_url,
            repo,
            milestone,
            PAGE_SIZE,
            page_number(start_at)
        );
        let request = ProviderRequest::get(url).with_timeout(SEARCH_TIMEOUT);
        let issues: Vec<GitHubIssue> = self.execute(identity, request).await?.json()?;
        Ok(Page::from_short_page(issues))
    }

    async fn search_page(
        &self,
        identity: &Identity,
        query: &str,
        start_at: u32,
    ) -> Result<Page<GitHubIssue>> {
        let url = format!(
            "{}/search/issues?q={}&per_page={}&page={}",
            self.rest_base_url,
            urlencoding::encode(query),
            PAGE_SIZE,
            page_number(start_at)
        );
        let request = ProviderRequest::get(url).with_timeout(SEARCH_TIMEOUT);
        let response: GitHubSearchResponse = self.execute(identity, request).await?.json()?;
        let reached_total = start_at as u64 + response.items.len() as u64 >= response.total_count;
        let page = Page::from_short_page(response.items);
        let is_last = page.is_last || reached_total;
        Ok(Page::new(page.values, is_last))
    }

    /// `None` when the issue does not exist (or is not visible)
    async fn fetch_issue(
        &self,
        identity: &Identity,
        repo: &str,
        number: u64,
    ) -> Result<Option<GitHubIssue>> {
        let url = format!("{}/repos/{}/issues/{}", self.rest_base_url, repo, number);
        let response = self.execute(identity, ProviderRequest::get(url)).await?;
        if response.status == 404 {
            return Ok(None);
        }
        Ok(Some(response.json()?))
    }

    /// Fetch selected issues one at a time
    async fn search_keys(
        &self,
        identity: &Identity,
        keys: &BTreeSet<String>,
        cancel: &CancellationToken,
    ) -> std::result::Result<SearchOutcome, QueryError> {
        let refs: Vec<(&str, u64)> = keys
            .iter()
            .filter_map(|key| {
                let parsed = parse_issue_ref(key);
                if parsed.is_none() {
                    warn!(key = %key, "Dropping invalid GitHub issue key");
                }
                parsed
            })
            .collect();
        if refs.is_empty() {
            return Err(QueryError::EmptyFilters);
        }

        let mut issues = IssueCollection::new();
        for (repo, number) in refs {
            if cancel.is_cancelled() {
                let fetched = issues.len();
                return Ok(SearchOutcome {
                    issues,
                    error: Some(QueryError::Cancelled { fetched }),
                });
            }

            match self.fetch_issue(identity, repo, number).await {
                Ok(Some(issue)) => {
                    if let Some((key, task)) = self.normalize(repo, &issue) {
                        issues.insert(key, task);
                    }
                }
                Ok(None) => warn!(repo, number, "Selected issue not found"),
                Err(e) if issues.is_empty() => {
                    return Err(QueryError::TransportFailure(e.to_string()))
                }
                Err(e) => {
                    warn!(repo, number, error = %e, "Issue fetch failed, returning partial result");
                    let fetched = issues.len();
                    return Ok(SearchOutcome {
                        issues,
                        error: Some(QueryError::PartialFailure {
                            fetched,
                            reason: e.to_string(),
                        }),
                    });
                }
            }
        }

        info!(provider = %self.config.id, issues = issues.len(), "Fetched selected issues");
        Ok(SearchOutcome::complete(issues))
    }

    async fn flag_one(&self, identity: &Identity, issue_id: String) -> Result<()> {
        let (repo, number) = parse_issue_ref(&issue_id)
            .ok_or_else(|| {
                ScrumboardError::Parse(format!("invalid GitHub issue key: {}", issue_id))
            })?;
        let url = format!(
            "{}/repos/{}/issues/{}/labels",
            self.rest_base_url, repo, number
        );
        let body = json!({ "labels": [self.config.labels.printed] });

        let response = self.execute(identity, ProviderRequest::post(url, body)).await?;
        if response.is_success() {
            debug!(issue = %issue_id, "Added printed label");
            Ok(())
        } else {
            Err(response.into_error())
        }
    }
}

#[async_trait]
impl Authenticator for GitHubProvider {
    fn provider_id(&self) -> &str {
        &self.config.id
    }

    async fn authenticate(
        &self,
        attempt: &LoginAttempt,
    ) -> std::result::Result<Identity, AuthError> {
        let url = format!("{}/user", self.rest_base_url);
        let credential = attempt.credential();

        debug!(
            provider = %self.config.id,
            login = %attempt.username,
            "Authenticating against GitHub"
        );

        let response = self
            .client
            .execute(&credential, ProviderRequest::get(url))
            .await
            .map_err(|e| {
                warn!(provider = %self.config.id, error = %e, "GitHub unreachable during login");
                AuthError::ProviderUnreachable(e.to_string())
            })?;

        if response.status != 200 || !response.has_body() {
            warn!(
                provider = %self.config.id,
                login = %attempt.username,
                status = response.status,
                "GitHub login rejected"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let user: GitHubUser = response.json().map_err(|e| {
            warn!(provider = %self.config.id, error = %e, "Unexpected GitHub user payload");
            AuthError::InvalidCredentials
        })?;

        let login = user
            .login
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| attempt.username.clone());
        let display_name = user
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| login.clone());

        info!(provider = %self.config.id, login = %login, "Authenticated");
        Ok(Identity::new(login, display_name, &self.config.id, credential)
            .with_email(user.email)
            .with_avatar_url(user.avatar_url))
    }
}

#[async_trait]
impl FilterResolver for GitHubProvider {
    async fn projects(&self, identity: &Identity) -> Result<ProjectInventory> {
        let repos = collect_all("github repositories", |start_at| {
            self.repo_page(identity, start_at)
        })
        .await?;
        debug!(repos = repos.len(), "Fetched GitHub repositories");
        Ok(ProjectInventory::from_unsorted(repos))
    }

    async fn sprints(&self, identity: &Identity, project: &ProjectRef) -> Result<SprintInventory> {
        let repo = valid_repo(&project.id)
            .ok_or_else(|| ScrumboardError::Parse(format!("invalid repository: {}", project.id)))?;
        let milestones = collect_all("github milestones", |start_at| {
            self.milestone_page(identity, repo, start_at)
        })
        .await?;

        let sprints = milestones
            .into_iter()
            .enumerate()
            .map(|(index, milestone)| {
                let state = if index == 0 {
                    SprintState::Active
                } else {
                    SprintState::Future
                };
                SprintRef::new(format!("{}:{}", repo, milestone.number), milestone.title, state)
            })
            .collect();
        Ok(SprintInventory::from_provider_order(sprints))
    }
}

#[async_trait]
impl SearchEngine for GitHubProvider {
    async fn search(
        &self,
        identity: &Identity,
        mode: &SearchMode,
        cancel: &CancellationToken,
    ) -> std::result::Result<SearchOutcome, QueryError> {
        match mode {
            SearchMode::ByKeys(keys) => self.search_keys(identity, keys, cancel).await,
            SearchMode::BySprint(id) => {
                let (repo, milestone) = parse_milestone_ref(id).ok_or_else(|| {
                    warn!(sprint = %id, "Not a milestone reference");
                    QueryError::EmptyFilters
                })?;
                debug!(provider = %self.config.id, repo, milestone, "Listing milestone issues");
                run_paged_search(
                    &self.config.id,
                    cancel,
                    |start_at| self.milestone_issue_page(identity, repo, milestone, start_at),
                    |issue: &GitHubIssue| self.normalize(repo, issue),
                )
                .await
            }
            SearchMode::ByQuery(query) => {
                let query = query.trim();
                if query.is_empty() {
                    return Err(QueryError::EmptyFilters);
                }
                debug!(provider = %self.config.id, query = %query, "Searching GitHub issues");
                run_paged_search(
                    &self.config.id,
                    cancel,
                    |start_at| self.search_page(identity, query, start_at),
                    |issue: &GitHubIssue| match issue.repository() {
                        Some(repo) => self.normalize(repo, issue),
                        None => {
                            warn!(number = issue.number, "Search result without repository");
                            None
                        }
                    },
                )
                .await
            }
        }
    }
}

#[async_trait]
impl FlagMutator for GitHubProvider {
    async fn flag_printed(
        &self,
        identity: &Identity,
        issue_ids: &BTreeSet<String>,
    ) -> std::result::Result<(), MutationError> {
        flag_each(
            &self.config.id,
            issue_ids,
            self.config.flag_concurrency,
            |issue_id| self.flag_one(identity, issue_id),
        )
        .await
    }
}
