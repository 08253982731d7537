//! Provider payload normalization
//!
//! Pure mapping from raw Jira/GitHub issue payloads to [`Task`]. No I/O
//! happens here; malformed optional fields are simply left out.

use super::github::GitHubIssue;
use super::jira::JiraIssue;
use crate::config::{FieldConfig, LabelConfig, ProviderConfig};
use crate::model::{Task, TaskKind};
use serde_json::Value;
use tracing::warn;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Maps provider issues onto the task model using a provider's label and
/// field configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueNormalizer {
    labels: LabelConfig,
    fields: FieldConfig,
}

impl IssueNormalizer {
    pub fn new(labels: LabelConfig, fields: FieldConfig) -> Self {
        Self { labels, fields }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(config.labels.clone(), config.fields.clone())
    }

    pub fn labels(&self) -> &LabelConfig {
        &self.labels
    }

    pub fn normalize_jira(&self, issue: &JiraIssue) -> Task {
        let fields = &issue.fields;
        let labels = fields.labels.as_deref().unwrap_or_default();
        let type_name = fields.issue_type.as_ref().map(|t| t.name.as_str());
        let (project, number) = split_key(&issue.key);

        let description = match fields.description {
            Some(Value::String(ref text)) if !text.is_empty() => Some(text.clone()),
            _ => None,
        };

        let time_box_hours = fields
            .aggregate_time_original_estimate
            .filter(|secs| *secs > 0.0)
            .map(hours_from_seconds);

        let is_subtask = type_name == Some(self.labels.subtask.as_str());
        let parent_key = fields.parent.as_ref().map(|p| p.key.as_str());
        let kind = self.task_kind(&issue.key, is_subtask, parent_key.map(|key| split_key(key).1));

        Task::new(issue.key.clone(), project, number, fields.summary.clone())
            .with_description(description)
            .with_time_box_hours(time_box_hours)
            .with_estimates(
                fields.custom.get(&self.fields.complexity).and_then(numeric_field),
                fields
                    .custom
                    .get(&self.fields.business_value)
                    .and_then(numeric_field),
            )
            .with_flags(
                type_name == Some(self.labels.user_story.as_str()),
                labels.iter().any(|l| *l == self.labels.proof_of_concept),
                self.is_printed(labels),
            )
            .with_kind(kind)
    }

    /// `repo` is the repository's full name (`owner/name`)
    pub fn normalize_github(&self, repo: &str, issue: &GitHubIssue) -> Task {
        let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
        let project = repo.rsplit('/').next().unwrap_or(repo);
        let number = issue.number.to_string();

        let is_subtask = labels.contains(&self.labels.subtask.as_str());
        let parent = issue.body.as_deref().and_then(parent_reference);
        let id = format!("{}-{}", project, number);
        let kind = self.task_kind(&id, is_subtask, parent.as_deref());

        Task::new(id, project, number, issue.title.clone())
            .with_description(issue.body.clone().filter(|b| !b.trim().is_empty()))
            .with_estimates(
                label_value(&labels, &self.fields.complexity),
                label_value(&labels, &self.fields.business_value),
            )
            .with_flags(
                labels.contains(&self.labels.user_story.as_str()),
                labels.contains(&self.labels.proof_of_concept.as_str()),
                self.is_printed(&labels),
            )
            .with_kind(kind)
    }

    /// Only the first label is compared with the printed tag
    fn is_printed<S: AsRef<str>>(&self, labels: &[S]) -> bool {
        labels
            .first()
            .is_some_and(|first| first.as_ref() == self.labels.printed)
    }

    fn task_kind(&self, key: &str, is_subtask: bool, parent_number: Option<&str>) -> TaskKind {
        match (is_subtask, parent_number) {
            (true, Some(parent)) if !parent.is_empty() => TaskKind::SubTask {
                parent_task_id: parent.to_string(),
            },
            (true, _) => {
                warn!(key = %key, "Subtask without parent, treating as task");
                TaskKind::Task
            }
            (false, _) => TaskKind::Task,
        }
    }
}

/// Split `PROJ-42` into `("PROJ", "42")` on the first `-`.
///
/// A key without `-` is all project and has an empty number.
pub fn split_key(key: &str) -> (&str, &str) {
    key.split_once('-').unwrap_or((key, ""))
}

fn hours_from_seconds(seconds: f64) -> u32 {
    (seconds / SECONDS_PER_HOUR).round() as u32
}

/// Custom field value: a number, a numeric string or an option object
/// `{"value": ...}`
fn numeric_field(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("value").and_then(numeric_field),
        _ => None,
    }
}

/// Value of a `<prefix>:<number>` label, e.g. `complexity:5`
fn label_value(labels: &[&str], prefix: &str) -> Option<f64> {
    labels.iter().find_map(|label| {
        let (name, value) = label.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(prefix) {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Parent issue number from a `Parent: #12` line
fn parent_reference(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let (name, value) = line.trim().split_once(':')?;
        if !name.trim().eq_ignore_ascii_case("parent") {
            return None;
        }
        let number = value.trim().trim_start_matches('#');
        (!number.is_empty() && number.chars().all(|c| c.is_ascii_digit()))
            .then(|| number.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalizer() -> IssueNormalizer {
        IssueNormalizer::new(LabelConfig::default(), FieldConfig::default())
    }

    fn jira_issue(value: Value) -> JiraIssue {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_jira_story() {
        let issue = jira_issue(json!({
            "id": "10042",
            "key": "PROJ-42",
            "fields": {
                "summary": "Checkout flow",
                "description": "As a user...",
                "issuetype": {"name": "Story"},
                "labels": ["Printed", "POC"],
                "aggregatetimeoriginalestimate": 7200,
                "customfield_11108": 5,
                "customfield_11109": 20
            }
        }));

        let task = normalizer().normalize_jira(&issue);
        assert_eq!(task.id, "PROJ-42");
        assert_eq!(task.project, "PROJ");
        assert_eq!(task.number, "42");
        assert_eq!(task.title, "Checkout flow");
        assert_eq!(task.description.as_deref(), Some("As a user..."));
        assert_eq!(task.time_box_hours, Some(2));
        assert_eq!(task.return_on_investment, Some(4.0));
        assert!(task.is_printed);
        assert!(task.is_user_story);
        assert!(task.is_proof_of_concept);
        assert_eq!(task.kind, TaskKind::Task);
    }

    #[test]
    fn test_printed_only_checks_first_label() {
        let issue = jira_issue(json!({
            "id": "1",
            "key": "PROJ-1",
            "fields": {"summary": "x", "labels": ["Backend", "Printed"]}
        }));
        assert!(!normalizer().normalize_jira(&issue).is_printed);
    }

    #[test]
    fn test_jira_subtask() {
        let issue = jira_issue(json!({
            "id": "2",
            "key": "PROJ-11",
            "fields": {
                "summary": "Write tests",
                "issuetype": {"name": "Sub-task"},
                "parent": {"key": "PROJ-10"},
                "labels": []
            }
        }));
        let task = normalizer().normalize_jira(&issue);
        assert_eq!(task.parent_task_id(), Some("10"));

        let orphan = jira_issue(json!({
            "id": "3",
            "key": "PROJ-12",
            "fields": {"summary": "Orphan", "issuetype": {"name": "Sub-task"}}
        }));
        assert_eq!(normalizer().normalize_jira(&orphan).kind, TaskKind::Task);
    }

    #[test]
    fn test_jira_missing_optional_fields() {
        let issue = jira_issue(json!({
            "id": "4",
            "key": "PROJ-4",
            "fields": {
                "summary": "Bare",
                "description": null,
                "labels": null,
                "aggregatetimeoriginalestimate": 0,
                "customfield_11108": {"value": "3"},
                "customfield_11109": [1]
            }
        }));
        let task = normalizer().normalize_jira(&issue);
        assert!(task.description.is_none());
        assert!(task.time_box_hours.is_none());
        assert_eq!(task.complexity, Some(3.0));
        assert!(task.business_value.is_none());
        assert!(task.return_on_investment.is_none());
        assert!(!task.is_printed);
    }

    #[test]
    fn test_time_box_rounds() {
        assert_eq!(hours_from_seconds(5400.0), 2);
        assert_eq!(hours_from_seconds(5000.0), 1);
        assert_eq!(hours_from_seconds(28800.0), 8);
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("PROJ-42"), ("PROJ", "42"));
        assert_eq!(split_key("MY-PROJ-7"), ("MY", "PROJ-7"));
        assert_eq!(split_key("ORPHAN"), ("ORPHAN", ""));
    }

    #[test]
    fn test_github_issue() {
        let normalizer = IssueNormalizer::new(
            LabelConfig::default(),
            FieldConfig {
                complexity: "complexity".to_string(),
                business_value: "value".to_string(),
            },
        );
        let issue: GitHubIssue = serde_json::from_value(json!({
            "id": 991,
            "number": 12,
            "title": "Split the importer",
            "body": "Some context\nParent: #7\n",
            "labels": [{"name": "Sub-task"}, {"name": "complexity:2"}, {"name": "value:8"}]
        }))
        .unwrap();

        let task = normalizer.normalize_github("acme/widgets", &issue);
        assert_eq!(task.id, "widgets-12");
        assert_eq!(task.project, "widgets");
        assert_eq!(task.number, "12");
        assert_eq!(task.parent_task_id(), Some("7"));
        assert_eq!(task.return_on_investment, Some(4.0));
        assert!(!task.is_printed);
    }

    #[test]
    fn test_numeric_field_variants() {
        assert_eq!(numeric_field(&json!(2.5)), Some(2.5));
        assert_eq!(numeric_field(&json!(" 8 ")), Some(8.0));
        assert_eq!(numeric_field(&json!({"value": 13})), Some(13.0));
        assert_eq!(numeric_field(&json!("high")), None);
        assert_eq!(numeric_field(&Value::Null), None);
    }
}
