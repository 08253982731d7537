//! Search filter state and provider inventories
//!
//! Projects and sprints are read-only snapshots of provider state, re-fetched
//! on every filter resolution. [`FilterSet`] is the only state that survives
//! between requests (see [`crate::session`]).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A project (Jira board, GitHub repository) as seen by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub name: String,
}

impl ProjectRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Reference known only by id (inventory unavailable)
    pub fn unnamed(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintState {
    Active,
    Future,
    Closed,
}

impl SprintState {
    /// Parse a provider state string; unknown states count as closed
    pub fn parse(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "active" => SprintState::Active,
            "future" => SprintState::Future,
            _ => SprintState::Closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintRef {
    pub id: String,
    pub name: String,
    pub state: SprintState,
}

impl SprintRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: SprintState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state,
        }
    }
}

/// Resolved search filters.
///
/// Without a `raw_query`, `sprint` is only set when it belongs to the sprint
/// inventory of `project`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint: Option<SprintRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_query: Option<String>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.project.is_none() && self.sprint.is_none() && self.raw_query.is_none()
    }

    /// The part of the filter state kept across requests
    pub fn persisted(&self) -> FilterSet {
        FilterSet {
            project: self.project.clone(),
            sprint: self.sprint.clone(),
            raw_query: None,
        }
    }
}

/// Filter parameters submitted with a search request (ids, not names)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub sprint: Option<String>,
    #[serde(default)]
    pub raw_query: Option<String>,
}

impl FilterRequest {
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_sprint(mut self, sprint: impl Into<String>) -> Self {
        self.sprint = Some(sprint.into());
        self
    }

    pub fn with_raw_query(mut self, query: impl Into<String>) -> Self {
        self.raw_query = Some(query.into());
        self
    }
}

/// Projects ordered by natural, case-insensitive name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectInventory {
    projects: Vec<ProjectRef>,
}

impl ProjectInventory {
    pub fn from_unsorted(mut projects: Vec<ProjectRef>) -> Self {
        projects.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        Self { projects }
    }

    pub fn get(&self, id: &str) -> Option<&ProjectRef> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectRef> {
        self.projects.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Sprints of one project, grouped by state.
///
/// The active bucket keeps provider order; the future bucket is sorted by
/// natural, case-insensitive name. Closed sprints are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SprintInventory {
    pub active: Vec<SprintRef>,
    pub future: Vec<SprintRef>,
}

impl SprintInventory {
    pub fn from_provider_order(sprints: Vec<SprintRef>) -> Self {
        let mut inventory = SprintInventory::default();
        for sprint in sprints {
            match sprint.state {
                SprintState::Active => inventory.active.push(sprint),
                SprintState::Future => inventory.future.push(sprint),
                SprintState::Closed => {}
            }
        }
        inventory.future.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        inventory
    }

    /// Default selection: first active sprint as returned by the provider
    pub fn first_active(&self) -> Option<&SprintRef> {
        self.active.first()
    }

    pub fn find(&self, id: &str) -> Option<&SprintRef> {
        self.active.iter().chain(self.future.iter()).find(|s| s.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.future.is_empty()
    }
}

/// Case-insensitive natural ordering: digit runs compare numerically,
/// so `Sprint 4` sorts before `Sprint 10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let l_num = l_run.trim_start_matches('0');
                let r_num = r_run.trim_start_matches('0');
                let ord = l_num
                    .len()
                    .cmp(&r_num.len())
                    .then_with(|| l_num.cmp(r_num));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}
