//! JIRA Integration Adapter
//!
//! Talks to the Jira REST API (identity, search, label updates) and the Jira
//! Agile API (boards and sprints). Boards play the role of projects.

use super::client::{ProviderClient, ProviderRequest, ProviderResponse, SEARCH_TIMEOUT};
use super::flag::flag_each;
use super::normalizer::IssueNormalizer;
use super::pagination::{collect_all, Page, PAGE_SIZE};
use super::search::{run_paged_search, SearchMode, SearchOutcome};
use super::{Authenticator, FilterResolver, FlagMutator, SearchEngine};
use crate::config::ProviderConfig;
use crate::error::{AuthError, MutationError, QueryError};
use crate::model::{
    Identity, LoginAttempt, ProjectInventory, ProjectRef, SprintInventory, SprintRef, SprintState,
};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const REST_API: &str = "rest/api/latest/";
const REST_AGILE: &str = "rest/agile/latest/";
const AVATAR_SIZE: &str = "24x24";

/// Jira provider
pub struct JiraProvider {
    client: Arc<dyn ProviderClient>,
    config: ProviderConfig,
    api_url: String,
    agile_url: String,
    normalizer: IssueNormalizer,
}

/// JIRA issue representation
#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: JiraFields,
}

/// JIRA issue fields
///
/// Custom fields (`customfield_*`) end up in `custom`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraFields {
    #[serde(default)]
    pub summary: String,
    /// Plain text on server instances, a document object on cloud ones
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(rename = "issuetype", default)]
    pub issue_type: Option<JiraIssueType>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub parent: Option<JiraParent>,
    /// Original estimate in seconds, subtasks included
    #[serde(rename = "aggregatetimeoriginalestimate", default)]
    pub aggregate_time_original_estimate: Option<f64>,
    #[serde(flatten)]
    pub custom: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssueType {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraParent {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraUser {
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
    #[serde(rename = "emailAddress", default)]
    email: Option<String>,
    #[serde(rename = "avatarUrls", default)]
    avatar_urls: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraSearchResponse {
    #[serde(rename = "startAt", default)]
    start_at: u32,
    #[serde(default)]
    total: u32,
    #[serde(rename = "isLast", default)]
    is_last: Option<bool>,
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

impl JiraSearchResponse {
    fn into_page(self) -> Page<JiraIssue> {
        let reached_total = self.start_at as usize + self.issues.len() >= self.total as usize;
        let is_last = self.is_last.unwrap_or(reached_total);
        Page::new(self.issues, is_last)
    }
}

/// Agile API collection page (`values` + `isLast`)
#[derive(Debug, Clone, Deserialize)]
struct AgilePage<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
    #[serde(rename = "isLast", default)]
    is_last: Option<bool>,
}

impl<T> AgilePage<T> {
    fn into_page<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        let values: Vec<U> = self.values.into_iter().map(f).collect();
        match self.is_last {
            Some(is_last) => Page::new(values, is_last),
            None => Page::from_short_page(values),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct JiraBoard {
    #[serde(deserialize_with = "id_string")]
    id: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraSprint {
    #[serde(deserialize_with = "id_string")]
    id: String,
    name: String,
    #[serde(default)]
    state: String,
}

/// Jira sends numeric ids as numbers in the Agile API and as strings in the
/// REST API
fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}

impl JiraProvider {
    pub fn new(config: ProviderConfig, client: Arc<dyn ProviderClient>) -> Self {
        let base_url = config.base_url();
        let api_url = format!("{}/{}", base_url, REST_API);
        let agile_url = format!("{}/{}", base_url, REST_AGILE);
        let normalizer = IssueNormalizer::from_config(&config);

        Self {
            client,
            config,
            api_url,
            agile_url,
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

    async fn board_page(&self, identity: &Identity, start_at: u32) -> Result<Page<ProjectRef>> {
        let url = format!(
            "{}board?maxResults={}&startAt={}",
            self.agile_url, PAGE_SIZE, start_at
        );
        let page: AgilePage<JiraBoard> = self
            .execute(identity, ProviderRequest::get(url))
            .await?
            .json()?;
        Ok(page.into_page(|board| ProjectRef::new(board.id, board.name)))
    }

    async fn sprint_page(
        &self,
        identity: &Identity,
        board_id: &str,
        start_at: u32,
    ) -> Result<Page<SprintRef>> {
        let url = format!(
            "{}board/{}/sprint?state=active&state=future&maxResults={}&startAt={}",
            self.agile_url,
            urlencoding::encode(board_id),
            PAGE_SIZE,
            start_at
        );
        let page: AgilePage<JiraSprint> = self
            .execute(identity, ProviderRequest::get(url))
            .await?
            .json()?;
        Ok(page.into_page(|sprint| {
            SprintRef::new(sprint.id, sprint.name, SprintState::parse(&sprint.state))
        }))
    }

    async fn search_page(
        &self,
        identity: &Identity,
        jql: &str,
        start_at: u32,
    ) -> Result<Page<JiraIssue>> {
        let url = format!(
            "{}search?jql={}&startAt={}&maxResults={}",
            self.api_url,
            urlencoding::encode(jql),
            start_at,
            PAGE_SIZE
        );
        let request = ProviderRequest::get(url).with_timeout(SEARCH_TIMEOUT);
        let response: JiraSearchResponse = self.execute(identity, request).await?.json()?;
        Ok(response.into_page())
    }

    async fn flag_one(&self, identity: &Identity, issue_id: String) -> Result<()> {
        let url = format!("{}issue/{}", self.api_url, urlencoding::encode(&issue_id));
        let body = json!({
            "update": {
                "labels": [
                    { "add": self.config.labels.printed }
                ]
            }
        });

        let response = self.execute(identity, ProviderRequest::put(url, body)).await?;
        if response.is_success() {
            debug!(issue = %issue_id, "Added printed label");
            Ok(())
        } else {
            Err(response.into_error())
        }
    }
}

#[async_trait]
impl Authenticator for JiraProvider {
    fn provider_id(&self) -> &str {
        &self.config.id
    }

    async fn authenticate(
        &self,
        attempt: &LoginAttempt,
    ) -> std::result::Result<Identity, AuthError> {
        let url = format!(
            "{}user?username={}",
            self.api_url,
            urlencoding::encode(&attempt.username)
        );
        let credential = attempt.credential();

        debug!(
            provider = %self.config.id,
            login = %attempt.username,
            "Authenticating against Jira"
        );

        let response = self
            .client
            .execute(&credential, ProviderRequest::get(url))
            .await
            .map_err(|e| {
                warn!(provider = %self.config.id, error = %e, "Jira unreachable during login");
                AuthError::ProviderUnreachable(e.to_string())
            })?;

        if response.status != 200 || !response.has_body() {
            warn!(
                provider = %self.config.id,
                login = %attempt.username,
                status = response.status,
                "Jira login rejected"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let mut user: JiraUser = response.json().map_err(|e| {
            warn!(provider = %self.config.id, error = %e, "Unexpected Jira user payload");
            AuthError::InvalidCredentials
        })?;

        let display_name = user
            .display_name
            .take()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| attempt.username.clone());

        info!(provider = %self.config.id, login = %attempt.username, "Authenticated");
        Ok(
            Identity::new(&attempt.username, display_name, &self.config.id, credential)
                .with_email(user.email)
                .with_avatar_url(user.avatar_urls.remove(AVATAR_SIZE)),
        )
    }
}

#[async_trait]
impl FilterResolver for JiraProvider {
    async fn projects(&self, identity: &Identity) -> Result<ProjectInventory> {
        let boards =
            collect_all("jira boards", |start_at| self.board_page(identity, start_at)).await?;
        debug!(boards = boards.len(), "Fetched Jira boards");
        Ok(ProjectInventory::from_unsorted(boards))
    }

    async fn sprints(&self, identity: &Identity, project: &ProjectRef) -> Result<SprintInventory> {
        let board_id = project.id.as_str();
        let sprints = collect_all("jira sprints", |start_at| {
            self.sprint_page(identity, board_id, start_at)
        })
        .await?;
        debug!(board = %board_id, sprints = sprints.len(), "Fetched Jira sprints");
        Ok(SprintInventory::from_provider_order(sprints))
    }
}

#[async_trait]
impl SearchEngine for JiraProvider {
    async fn search(
        &self,
        identity: &Identity,
        mode: &SearchMode,
        cancel: &CancellationToken,
    ) -> std::result::Result<SearchOutcome, QueryError> {
        let jql = mode.jql().ok_or(QueryError::EmptyFilters)?;
        let jql = jql.as_str();
        debug!(provider = %self.config.id, jql = %jql, "Searching Jira issues");

        run_paged_search(
            &self.config.id,
            cancel,
            |start_at| self.search_page(identity, jql, start_at),
            |issue: &JiraIssue| Some((issue.id.clone(), self.normalizer.normalize_jira(issue))),
        )
        .await
    }
}

#[async_trait]
impl FlagMutator for JiraProvider {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::integrations::client::Method;
    use crate::integrations::testing::{identity, LabelBoard, ScriptedClient};
    use crate::model::{FilterRequest, FilterSet};

    const URL: &str = "https://jira.example.com/";

    fn provider(client: Arc<dyn ProviderClient>) -> JiraProvider {
        JiraProvider::new(ProviderConfig::jira(URL), client)
    }

    fn issues(start: u32, count: u32) -> Vec<Value> {
        (start..start + count)
            .map(|n| {
                json!({
                    "id": (10000 + n).to_string(),
                    "key": format!("PROJ-{}", n),
                    "fields": {"summary": format!("Issue {}", n), "labels": []}
                })
            })
            .collect()
    }

    fn search_page(start: u32, count: u32, total: u32) -> Value {
        json!({
            "startAt": start,
            "maxResults": 50,
            "total": total,
            "issues": issues(start, count)
        })
    }

    #[test]
    fn test_provider_urls() {
        let jira = provider(Arc::new(ScriptedClient::new()));
        assert_eq!(jira.api_url, "https://jira.example.com/rest/api/latest/");
        assert_eq!(jira.agile_url, "https://jira.example.com/rest/agile/latest/");
        assert_eq!(jira.provider_id(), "jira");
    }

    #[tokio::test]
    async fn test_authenticate() {
        let client = ScriptedClient::new().respond(
            "user?username=jdoe",
            200,
            json!({
                "name": "jdoe",
                "displayName": "Jane Doe",
                "emailAddress": "jane@example.com",
                "avatarUrls": {"16x16": "https://a/16", "24x24": "https://a/24"}
            }),
        );
        let jira = provider(Arc::new(client));

        let identity = jira
            .authenticate(&LoginAttempt::new("jdoe", "secret"))
            .await
            .unwrap();

        assert_eq!(identity.login, "jdoe");
        assert_eq!(identity.display_name, "Jane Doe");
        assert_eq!(identity.email.as_deref(), Some("jane@example.com"));
        assert_eq!(identity.avatar_url.as_deref(), Some("https://a/24"));
        assert_eq!(identity.provider_id, "jira");
        assert_eq!(identity.credential().username(), "jdoe");
    }

    #[tokio::test]
    async fn test_authenticate_rejections() {
        let client = ScriptedClient::new()
            .respond("user?", 401, Value::Null)
            .respond("user?", 200, Value::Null)
            .fail("user?", TransportError::Timeout("10s".to_string()));
        let jira = provider(Arc::new(client));
        let attempt = LoginAttempt::new("jdoe", "wrong");

        assert_eq!(
            jira.authenticate(&attempt).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            jira.authenticate(&attempt).await,
            Err(AuthError::InvalidCredentials)
        );
        assert!(matches!(
            jira.authenticate(&attempt).await,
            Err(AuthError::ProviderUnreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_projects_paginate_and_sort() {
        let client = ScriptedClient::new()
            .respond(
                "board?",
                200,
                json!({
                    "isLast": false,
                    "values": [{"id": 3, "name": "board 10"}, {"id": 1, "name": "Board 2"}]
                }),
            )
            .respond(
                "board?",
                200,
                json!({"isLast": true, "values": [{"id": 2, "name": "Apps"}]}),
            );
        let client = Arc::new(client);
        let jira = provider(client.clone());

        let projects = jira.projects(&identity("jira")).await.unwrap();
        assert_eq!(projects.names(), vec!["Apps", "Board 2", "board 10"]);
        assert_eq!(projects.get("3").map(|p| p.name.as_str()), Some("board 10"));

        let urls: Vec<String> = client.requests().into_iter().map(|r| r.url).collect();
        assert!(urls[0].ends_with("board?maxResults=50&startAt=0"));
        assert!(urls[1].ends_with("board?maxResults=50&startAt=50"));
    }

    #[tokio::test]
    async fn test_resolve_filters_defaults_sprint() {
        let client = ScriptedClient::new()
            .respond(
                "board?",
                200,
                json!({"isLast": true, "values": [{"id": 3, "name": "Board"}]}),
            )
            .respond(
                "board/3/sprint",
                200,
                json!({"isLast": true, "values": [
                    {"id": 9, "name": "Sprint 5", "state": "future"},
                    {"id": 7, "name": "Sprint 3", "state": "active"},
                    {"id": 8, "name": "Sprint 4", "state": "future"}
                ]}),
            );
        let jira = provider(Arc::new(client));

        let resolution = jira
            .resolve_filters(
                &identity("jira"),
                &FilterRequest::default().with_project("3"),
                &FilterSet::default(),
            )
            .await;

        assert!(resolution.error.is_none());
        assert_eq!(resolution.filters.sprint.map(|s| s.name), Some("Sprint 3".to_string()));
        let future: Vec<&str> = resolution.sprints.future.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(future, vec!["Sprint 4", "Sprint 5"]);
    }

    #[tokio::test]
    async fn test_search_paginates_to_the_end() {
        let client = ScriptedClient::new()
            .respond("search?", 200, search_page(0, 50, 120))
            .respond("search?", 200, search_page(50, 50, 120))
            .respond("search?", 200, search_page(100, 20, 120));
        let client = Arc::new(client);
        let jira = provider(client.clone());

        let outcome = jira
            .search(
                &identity("jira"),
                &SearchMode::BySprint("7".to_string()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.issues.len(), 120);
        assert_eq!(outcome.issues.keys().next(), Some("10000"));

        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0]
            .url
            .contains("jql=sprint%3D7%20AND%20status%20not%20in%20%28Closed%29"));
        assert!(requests[1].url.contains("startAt=50"));
        assert!(requests[2].url.contains("startAt=100"));
        assert_eq!(requests[0].timeout, SEARCH_TIMEOUT);
    }

    #[tokio::test]
    async fn test_search_partial_failure() {
        let client = ScriptedClient::new()
            .respond("search?", 200, search_page(0, 50, 120))
            .respond("search?", 500, json!({"errorMessages": ["Internal error"]}));
        let jira = provider(Arc::new(client));

        let outcome = jira
            .search(
                &identity("jira"),
                &SearchMode::ByQuery("project = PROJ".to_string()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.issues.len(), 50);
        match outcome.error {
            Some(QueryError::PartialFailure { fetched, reason }) => {
                assert_eq!(fetched, 50);
                assert!(reason.contains("Internal error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_first_page_failure() {
        let client =
            ScriptedClient::new().fail("search?", TransportError::Timeout("30s".to_string()));
        let jira = provider(Arc::new(client));

        let result = jira
            .search(
                &identity("jira"),
                &SearchMode::BySprint("7".to_string()),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(QueryError::TransportFailure(_))));
    }

    /// Cancels the search as soon as the first page has been served
    struct CancelAfterFirst {
        inner: ScriptedClient,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl ProviderClient for CancelAfterFirst {
        async fn execute(
            &self,
            credential: &crate::model::Credential,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, TransportError> {
            let response = self.inner.execute(credential, request).await;
            self.cancel.cancel();
            response
        }
    }

    #[tokio::test]
    async fn test_search_cancellation_returns_partial() {
        let cancel = CancellationToken::new();
        let client = Arc::new(CancelAfterFirst {
            inner: ScriptedClient::new()
                .respond("search?", 200, search_page(0, 50, 120))
                .respond("search?", 200, search_page(50, 50, 120)),
            cancel: cancel.clone(),
        });
        let jira = provider(client.clone());

        let outcome = jira
            .search(&identity("jira"), &SearchMode::BySprint("7".to_string()), &cancel)
            .await
            .unwrap();

        assert_eq!(outcome.issues.len(), 50);
        assert_eq!(outcome.error, Some(QueryError::Cancelled { fetched: 50 }));
        assert_eq!(client.inner.request_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_is_last_uses_total() {
        let client = ScriptedClient::new().respond("search?", 200, search_page(0, 2, 2));
        let client = Arc::new(client);
        let jira = provider(client.clone());

        let keys: BTreeSet<String> = ["PROJ-0", "PROJ-1"].iter().map(|s| s.to_string()).collect();
        let outcome = jira
            .search(&identity("jira"), &SearchMode::ByKeys(keys), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.issues.len(), 2);
        assert_eq!(client.request_count(), 1);
        assert!(client.requests()[0].url.contains("issueKey%20IN%20%28PROJ-0%2CPROJ-1%29"));
    }

    #[tokio::test]
    async fn test_duplicate_issue_across_pages_keeps_first() {
        let mut second = search_page(50, 2, 52);
        second["issues"][0]["id"] = json!("10000");
        second["issues"][0]["key"] = json!("PROJ-DUP");
        let client = ScriptedClient::new()
            .respond("search?", 200, search_page(0, 50, 52))
            .respond("search?", 200, second);
        let jira = provider(Arc::new(client));

        let outcome = jira
            .search(
                &identity("jira"),
                &SearchMode::BySprint("7".to_string()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.issues.len(), 51);
        assert_eq!(outcome.issues.get("10000").map(|t| t.id.as_str()), Some("PROJ-0"));
    }

    #[tokio::test]
    async fn test_flag_is_idempotent() {
        let board = Arc::new(LabelBoard::default());
        let jira = provider(board.clone());
        let ids: BTreeSet<String> = ["PROJ-1", "PROJ-2"].iter().map(|s| s.to_string()).collect();

        jira.flag_printed(&identity("jira"), &ids).await.unwrap();
        jira.flag_printed(&identity("jira"), &ids).await.unwrap();

        assert_eq!(
            board.labels_of("PROJ-1").into_iter().collect::<Vec<_>>(),
            vec!["Printed".to_string()]
        );
        assert_eq!(board.labels_of("PROJ-2").len(), 1);
    }

    #[tokio::test]
    async fn test_flag_reports_failed_issues() {
        let board = Arc::new(LabelBoard::failing_on(&["PROJ-2"]));
        let jira = provider(board.clone());
        let ids: BTreeSet<String> = ["PROJ-1", "PROJ-2", "PROJ-3"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let err = jira.flag_printed(&identity("jira"), &ids).await.unwrap_err();

        assert_eq!(err.failed_ids(), vec!["PROJ-2"]);
        assert!(board.labels_of("PROJ-1").contains("Printed"));
        assert!(board.labels_of("PROJ-3").contains("Printed"));
    }

    #[tokio::test]
    async fn test_flag_request_shape() {
        let client = Arc::new(ScriptedClient::new().respond("issue/PROJ-1", 204, Value::Null));
        let jira = provider(client.clone());
        let ids: BTreeSet<String> = ["PROJ-1".to_string()].into();

        jira.flag_printed(&identity("jira"), &ids).await.unwrap();

        let request = &client.requests()[0];
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.url, "https://jira.example.com/rest/api/latest/issue/PROJ-1");
        assert_eq!(
            request.body,
            Some(json!({"update": {"labels": [{"add": "Printed"}]}}))
        );
    }
}
