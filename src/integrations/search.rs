//! Search modes and the shared paged-search driver

use super::pagination::{paginate, Page, PageStop};
use crate::error::QueryError;
use crate::model::{FilterSet, IssueCollection, Task};
use std::collections::BTreeSet;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What to search for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// Open issues of a sprint
    BySprint(String),
    /// An explicit selection of issue keys
    ByKeys(BTreeSet<String>),
    /// A provider query expression (JQL, GitHub search syntax)
    ByQuery(String),
}

impl SearchMode {
    /// Pick the mode for a request: explicit keys win over the sprint in the
    /// filter state, which wins over the raw query.
    pub fn select<I, S>(keys: I, filters: &FilterSet) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: BTreeSet<String> = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if !keys.is_empty() {
            return Ok(SearchMode::ByKeys(keys));
        }
        if let Some(ref sprint) = filters.sprint {
            return Ok(SearchMode::BySprint(sprint.id.clone()));
        }
        match filters.raw_query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => Ok(SearchMode::ByQuery(query.to_string())),
            _ => Err(QueryError::EmptyFilters),
        }
    }

    /// Jira query expression for this mode, `None` when nothing usable is left
    pub fn jql(&self) -> Option<String> {
        match self {
            SearchMode::BySprint(id) => {
                let id = id.trim();
                if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
                    warn!(sprint = %id, "Ignoring non-numeric sprint id");
                    return None;
                }
                Some(format!("sprint={} AND status not in (Closed)", id))
            }
            SearchMode::ByKeys(keys) => {
                let safe: Vec<String> = keys.iter().filter_map(|k| sanitize_key(k)).collect();
                if safe.is_empty() {
                    None
                } else {
                    Some(format!("issueKey IN ({})", safe.join(",")))
                }
            }
            SearchMode::ByQuery(query) => {
                let query = query.trim();
                (!query.is_empty()).then(|| query.to_string())
            }
        }
    }
}

/// Accept only issue keys made of alphanumerics, `-` and `_`, which keeps
/// selections from injecting query syntax.
pub fn sanitize_key(key: &str) -> Option<String> {
    let key = key.trim();
    if !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Some(key.to_string())
    } else {
        warn!(key = %key, "Dropping invalid issue key");
        None
    }
}

/// Result of a search: issues fetched, plus a soft error when the
/// collection is incomplete
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub issues: IssueCollection,
    pub error: Option<QueryError>,
}

impl SearchOutcome {
    pub fn complete(issues: IssueCollection) -> Self {
        Self {
            issues,
            error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Run a paginated search, normalizing each page as it arrives.
///
/// A failure on the first page is fatal; later failures and cancellation
/// return what was gathered so far with a soft error.
pub async fn run_paged_search<T, F, Fut, N>(
    provider: &str,
    cancel: &CancellationToken,
    fetch: F,
    normalize: N,
) -> Result<SearchOutcome, QueryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = crate::Result<Page<T>>>,
    N: Fn(&T) -> Option<(String, Task)>,
{
    let mut issues = IssueCollection::new();
    let outcome = paginate(provider, cancel, fetch, |page| {
        for raw in &page {
            if let Some((issue_id, task)) = normalize(raw) {
                issues.insert(issue_id, task);
            }
        }
    })
    .await;

    let fetched = issues.len();
    let error = match outcome.stop {
        PageStop::Completed | PageStop::EmptyPage => None,
        PageStop::Cancelled => Some(QueryError::Cancelled { fetched }),
        PageStop::Failed { page: 1, error } => {
            warn!(provider, error = %error, "Search failed on first page");
            return Err(QueryError::TransportFailure(error.to_string()));
        }
        PageStop::Failed { page, error } => {
            warn!(
                provider,
                page,
                fetched,
                error = %error,
                "Search failed part way, returning partial result"
            );
            Some(QueryError::PartialFailure {
                fetched,
                reason: error.to_string(),
            })
        }
    };

    info!(
        provider,
        pages = outcome.pages,
        issues = fetched,
        complete = error.is_none(),
        "Search complete"
    );
    Ok(SearchOutcome { issues, error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::pagination::PAGE_SIZE;
    use crate::model::{ProjectRef, SprintRef, SprintState};
    use crate::ScrumboardError;

    fn sprint_filters() -> FilterSet {
        FilterSet {
            project: Some(ProjectRef::new("3", "Board")),
            sprint: Some(SprintRef::new("7", "Sprint 3", SprintState::Active)),
            raw_query: Some("project = X".to_string()),
        }
    }

    #[test]
    fn test_select_precedence() {
        let filters = sprint_filters();

        let mode = SearchMode::select(["PROJ-2", "PROJ-1"], &filters).unwrap();
        assert_eq!(
            mode,
            SearchMode::ByKeys(["PROJ-1".to_string(), "PROJ-2".to_string()].into())
        );

        let no_keys: [&str; 0] = [];
        let mode = SearchMode::select(no_keys, &filters).unwrap();
        assert_eq!(mode, SearchMode::BySprint("7".to_string()));

        let filters = FilterSet {
            sprint: None,
            ..sprint_filters()
        };
        let mode = SearchMode::select(no_keys, &filters).unwrap();
        assert_eq!(mode, SearchMode::ByQuery("project = X".to_string()));
    }

    #[test]
    fn test_select_empty_filters() {
        let no_keys: [&str; 0] = [];
        assert_eq!(
            SearchMode::select(no_keys, &FilterSet::default()),
            Err(QueryError::EmptyFilters)
        );
        assert_eq!(
            SearchMode::select(["  "], &FilterSet::default()),
            Err(QueryError::EmptyFilters)
        );
    }

    #[test]
    fn test_jql_building() {
        assert_eq!(
            SearchMode::BySprint("7".to_string()).jql().as_deref(),
            Some("sprint=7 AND status not in (Closed)")
        );
        let keys: BTreeSet<String> = ["PROJ-1", "PROJ-2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            SearchMode::ByKeys(keys).jql().as_deref(),
            Some("issueKey IN (PROJ-1,PROJ-2)")
        );
        assert_eq!(SearchMode::BySprint("7 OR 1=1".to_string()).jql(), None);
    }

    #[test]
    fn test_key_sanitization() {
        assert_eq!(sanitize_key("PROJ-42").as_deref(), Some("PROJ-42"));
        assert_eq!(sanitize_key("PROJ-1) OR (1=1"), None);

        let keys: BTreeSet<String> = ["PROJ-1", "X\" OR"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            SearchMode::ByKeys(keys).jql().as_deref(),
            Some("issueKey IN (PROJ-1)")
        );
    }

    fn numbered(start_at: u32, len: u32) -> Vec<u32> {
        (start_at..start_at + len).collect()
    }

    fn to_task(n: &u32) -> Option<(String, Task)> {
        Some((n.to_string(), Task::new(format!("P-{}", n), "P", n.to_string(), "t")))
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_first_page() {
        let outcome = run_paged_search(
            "test",
            &CancellationToken::new(),
            |start_at| async move {
                if start_at == 0 {
                    Ok(Page::new(numbered(0, PAGE_SIZE), false))
                } else {
                    Err(ScrumboardError::Other("connection reset".to_string()))
                }
            },
            to_task,
        )
        .await
        .unwrap();

        assert_eq!(outcome.issues.len(), 50);
        assert!(matches!(
            outcome.error,
            Some(QueryError::PartialFailure { fetched: 50, .. })
        ));
    }

    #[tokio::test]
    async fn test_first_page_failure_is_fatal() {
        let result = run_paged_search(
            "test",
            &CancellationToken::new(),
            |_| async { Err::<Page<u32>, _>(ScrumboardError::Other("unreachable".to_string())) },
            to_task,
        )
        .await;

        assert!(matches!(result, Err(QueryError::TransportFailure(_))));
    }
}
