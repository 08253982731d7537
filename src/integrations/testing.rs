//! Scripted provider client for unit tests

use super::client::{Method, ProviderClient, ProviderRequest, ProviderResponse};
use crate::error::TransportError;
use crate::model::{Credential, Identity};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;

type Scripted = std::result::Result<ProviderResponse, TransportError>;

/// Replays queued responses for requests whose URL contains a pattern.
///
/// Routes are matched in registration order; a route is skipped once its
/// queue is drained. Unmatched requests fail with a transport error.
#[derive(Default)]
pub struct ScriptedClient {
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, pattern: &str, status: u16, body: Value) -> Self {
        self.push(pattern, Ok(ProviderResponse::new(status, body)));
        self
    }

    pub fn fail(self, pattern: &str, error: TransportError) -> Self {
        self.push(pattern, Err(error));
        self
    }

    fn push(&self, pattern: &str, scripted: Scripted) {
        let mut routes = self.routes.lock().unwrap();
        if let Some((_, queue)) = routes.iter_mut().find(|(p, _)| p == pattern) {
            queue.push_back(scripted);
        } else {
            routes.push((pattern.to_string(), VecDeque::from([scripted])));
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderClient for ScriptedClient {
    async fn execute(&self, _credential: &Credential, request: ProviderRequest) -> Scripted {
        self.requests.lock().unwrap().push(request.clone());
        let mut routes = self.routes.lock().unwrap();
        for (pattern, queue) in routes.iter_mut() {
            if request.url.contains(pattern.as_str()) {
                if let Some(next) = queue.pop_front() {
                    return next;
                }
            }
        }
        Err(TransportError::Request(format!("no scripted response for {}", request.url)))
    }
}

/// Provider double that keeps a label set per issue and applies
/// Jira `update.labels[].add` and GitHub label POST bodies to it
#[derive(Default)]
pub struct LabelBoard {
    labels: Mutex<HashMap<String, BTreeSet<String>>>,
    failing: BTreeSet<String>,
}

impl LabelBoard {
    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            labels: Mutex::new(HashMap::new()),
            failing: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn labels_of(&self, issue: &str) -> BTreeSet<String> {
        self.labels
            .lock()
            .unwrap()
            .get(issue)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProviderClient for LabelBoard {
    async fn execute(&self, _credential: &Credential, request: ProviderRequest) -> Scripted {
        let issue = request
            .url
            .rsplit_once("/issues/")
            .or_else(|| request.url.rsplit_once("/issue/"))
            .map(|(_, rest)| rest.trim_end_matches("/labels").to_string())
            .unwrap_or_default();
        if self.failing.contains(&issue) {
            return Err(TransportError::Timeout(format!("flagging {}", issue)));
        }

        let body = request.body.unwrap_or(Value::Null);
        let added: Vec<String> = match request.method {
            Method::Put => body["update"]["labels"]
                .as_array()
                .map(|ops| {
                    ops.iter()
                        .filter_map(|op| op["add"].as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            Method::Post => body["labels"]
                .as_array()
                .map(|l| l.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            Method::Get => Vec::new(),
        };

        self.labels
            .lock()
            .unwrap()
            .entry(issue)
            .or_default()
            .extend(added);
        Ok(ProviderResponse::new(204, Value::Null))
    }
}

pub fn identity(provider: &str) -> Identity {
    Identity::new("jdoe", "Jane Doe", provider, Credential::new("jdoe", "secret"))
}
