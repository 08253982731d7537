//! Provider configuration
//!
//! Describes one issue-tracking backend: where it lives, which labels mean
//! "printed", "POC", "user story" and "subtask", and which custom fields hold
//! complexity and business value.

use serde::{Deserialize, Serialize};

/// Backend flavour a provider entry is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Jira REST + Agile API
    Jira,

    /// GitHub (or GitHub Enterprise) REST API
    #[serde(rename = "github")]
    GitHub,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Jira => write!(f, "jira"),
            ProviderKind::GitHub => write!(f, "github"),
        }
    }
}

/// Label and issue-type names the normalizer and flag mutator look for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Label added to issues once their card has been printed
    #[serde(default = "default_printed_label")]
    pub printed: String,

    /// Label marking a proof of concept
    #[serde(default = "default_poc_label")]
    pub proof_of_concept: String,

    /// Issue type name of user stories
    #[serde(default = "default_user_story_label")]
    pub user_story: String,

    /// Issue type name of subtasks
    #[serde(default = "default_subtask_label")]
    pub subtask: String,
}

fn default_printed_label() -> String {
    "Printed".to_string()
}

fn default_poc_label() -> String {
    "POC".to_string()
}

fn default_user_story_label() -> String {
    "Story".to_string()
}

fn default_subtask_label() -> String {
    "Sub-task".to_string()
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            printed: default_printed_label(),
            proof_of_concept: default_poc_label(),
            user_story: default_user_story_label(),
            subtask: default_subtask_label(),
        }
    }
}

/// Custom field identifiers.
///
/// For Jira these are field ids (`customfield_11108`); for GitHub they are
/// label prefixes (`complexity` matches a `complexity:5` label).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default = "default_complexity_field")]
    pub complexity: String,

    #[serde(default = "default_business_value_field")]
    pub business_value: String,
}

fn default_complexity_field() -> String {
    "customfield_11108".to_string()
}

fn default_business_value_field() -> String {
    "customfield_11109".to_string()
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            complexity: default_complexity_field(),
            business_value: default_business_value_field(),
        }
    }
}

/// A configured provider instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identifier used to select the provider (e.g. "jira", "github-corp")
    pub id: String,

    pub kind: ProviderKind,

    /// Base URL (e.g. "https://jira.example.com" or "https://github.com")
    pub url: String,

    #[serde(default)]
    pub labels: LabelConfig,

    #[serde(default)]
    pub fields: FieldConfig,

    /// Upper bound on concurrent flag requests
    #[serde(default = "default_flag_concurrency")]
    pub flag_concurrency: usize,
}

fn default_flag_concurrency() -> usize {
    4
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, kind: ProviderKind, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            url: url.into(),
            labels: LabelConfig::default(),
            fields: FieldConfig::default(),
            flag_concurrency: default_flag_concurrency(),
        }
    }

    /// Jira provider registered under the id "jira"
    pub fn jira(url: impl Into<String>) -> Self {
        Self::new("jira", ProviderKind::Jira, url)
    }

    /// GitHub provider registered under the id "github"
    pub fn github(url: impl Into<String>) -> Self {
        let mut config = Self::new("github", ProviderKind::GitHub, url);
        config.fields = FieldConfig {
            complexity: "complexity".to_string(),
            business_value: "value".to_string(),
        };
        config
    }

    pub fn with_labels(mut self, labels: LabelConfig) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_fields(mut self, fields: FieldConfig) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_flag_concurrency(mut self, concurrency: usize) -> Self {
        self.flag_concurrency = concurrency;
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}
