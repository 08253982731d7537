//! Normalized ticket model
//!
//! Every search produces a fresh [`IssueCollection`]; tasks are never mutated
//! after normalization.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use tracing::warn;

/// Task or subtask. A subtask always knows its parent's number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    Task,
    #[serde(rename = "subtask")]
    SubTask { parent_task_id: String },
}

/// A provider issue normalized for printing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Provider key, e.g. `PROJ-42`
    pub id: String,
    pub project: String,
    /// Suffix of `id` after the `project-` prefix
    pub number: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_box_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_value: Option<f64>,
    #[serde(default)]
    pub is_user_story: bool,
    #[serde(default)]
    pub is_proof_of_concept: bool,
    #[serde(default)]
    pub is_printed: bool,
    #[serde(flatten)]
    pub kind: TaskKind,
    /// `None` means unknown, which is not the same as zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_on_investment: Option<f64>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        project: impl Into<String>,
        number: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project: project.into(),
            number: number.into(),
            title: title.into(),
            description: None,
            time_box_hours: None,
            complexity: None,
            business_value: None,
            is_user_story: false,
            is_proof_of_concept: false,
            is_printed: false,
            kind: TaskKind::Task,
            return_on_investment: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_time_box_hours(mut self, hours: Option<u32>) -> Self {
        self.time_box_hours = hours;
        self
    }

    /// Set complexity and business value, deriving the return on investment
    pub fn with_estimates(mut self, complexity: Option<f64>, business_value: Option<f64>) -> Self {
        self.complexity = complexity;
        self.business_value = business_value;
        self.return_on_investment = return_on_investment(complexity, business_value);
        self
    }

    pub fn with_flags(mut self, user_story: bool, proof_of_concept: bool, printed: bool) -> Self {
        self.is_user_story = user_story;
        self.is_proof_of_concept = proof_of_concept;
        self.is_printed = printed;
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_subtask(&self) -> bool {
        matches!(self.kind, TaskKind::SubTask { .. })
    }

    pub fn parent_task_id(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::SubTask { parent_task_id } => Some(parent_task_id),
            TaskKind::Task => None,
        }
    }
}

/// `business_value / max(complexity, 1)`, or `None` if either input is missing
pub fn return_on_investment(complexity: Option<f64>, business_value: Option<f64>) -> Option<f64> {
    match (complexity, business_value) {
        (Some(complexity), Some(value)) => Some(value / complexity.max(1.0)),
        _ => None,
    }
}

/// Issues keyed by provider issue id, in provider response order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueCollection {
    entries: Vec<(String, Task)>,
    index: HashMap<String, usize>,
}

impl IssueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task. A repeated issue id keeps its first occurrence.
    pub fn insert(&mut self, issue_id: impl Into<String>, task: Task) -> bool {
        let issue_id = issue_id.into();
        if self.index.contains_key(&issue_id) {
            warn!(
                issue_id = %issue_id,
                key = %task.id,
                "Duplicate issue in provider response, keeping first"
            );
            return false;
        }
        self.index.insert(issue_id.clone(), self.entries.len());
        self.entries.push((issue_id, task));
        true
    }

    pub fn get(&self, issue_id: &str) -> Option<&Task> {
        self.index.get(issue_id).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter().map(|(_, task)| task)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Task)> {
        self.entries.iter().map(|(id, task)| (id.as_str(), task))
    }

    /// Parent of a subtask when it is part of this collection
    pub fn parent_of(&self, task: &Task) -> Option<&Task> {
        self.parent_in(task, self)
    }

    /// Parent of a subtask looked up in another, separately fetched collection
    pub fn parent_in<'a>(&self, task: &Task, parents: &'a IssueCollection) -> Option<&'a Task> {
        let parent_number = task.parent_task_id()?;
        parents
            .tasks()
            .find(|candidate| {
                candidate.project == task.project && candidate.number == parent_number
            })
    }

    /// Subtasks whose parent is not part of this collection
    pub fn unresolved_subtasks(&self) -> Vec<&Task> {
        self.tasks()
            .filter(|t| t.is_subtask() && self.parent_of(t).is_none())
            .collect()
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.entries.into_iter().map(|(_, task)| task).collect()
    }
}

impl Serialize for IssueCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, task) in &self.entries {
            map.serialize_entry(id, task)?;
        }
        map.end()
    }
}
