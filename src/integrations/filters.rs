//! Filter resolution shared by all providers
//!
//! Providers only know how to list projects and sprints; reconciling a
//! request with the saved filter state and the fetched inventories happens
//! here.

use super::FilterResolver;
use crate::model::{
    FilterRequest, FilterSet, Identity, ProjectInventory, ProjectRef, SprintInventory, SprintRef,
    SprintState,
};
use crate::ScrumboardError;
use tracing::{debug, warn};

/// Resolved filters plus the inventories they were checked against
#[derive(Debug, Default)]
pub struct FilterResolution {
    pub filters: FilterSet,
    pub projects: ProjectInventory,
    /// Sprints of `filters.project`; empty when no project is selected
    pub sprints: SprintInventory,
    /// First fetch failure, if any. The rest of the resolution is still usable.
    pub error: Option<ScrumboardError>,
}

impl FilterResolution {
    fn record(&mut self, what: &str, error: ScrumboardError) {
        warn!(what, error = %error, "Filter inventory fetch failed");
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) async fn resolve<R>(
    resolver: &R,
    identity: &Identity,
    request: &FilterRequest,
    saved: &FilterSet,
) -> FilterResolution
where
    R: FilterResolver + ?Sized,
{
    let mut resolution = FilterResolution::default();
    resolution.filters.raw_query = non_empty(request.raw_query.as_ref());

    match resolver.projects(identity).await {
        Ok(projects) => resolution.projects = projects,
        Err(e) => resolution.record("projects", e),
    }

    let project_id =
        non_empty(request.project.as_ref())
            .or_else(|| saved.project.as_ref().map(|p| p.id.clone()));
    let project = match project_id {
        Some(id) => match resolution.projects.get(&id) {
            Some(found) => found.clone(),
            None => saved
                .project
                .clone()
                .filter(|p| p.id == id)
                .unwrap_or_else(|| ProjectRef::unnamed(id)),
        },
        None => {
            debug!(login = %identity.login, "No project selected");
            return resolution;
        }
    };

    let requested_sprint = non_empty(request.sprint.as_ref());
    let sprint = match resolver.sprints(identity, &project).await {
        Ok(sprints) => {
            let sprint = pick_sprint(&sprints, requested_sprint.as_deref());
            resolution.sprints = sprints;
            sprint
        }
        Err(e) => {
            resolution.record("sprints", e);
            // Without a raw query a sprint needs a verified inventory
            match resolution.filters.raw_query {
                Some(_) => requested_sprint.map(|id| SprintRef {
                    name: id.clone(),
                    id,
                    state: SprintState::Active,
                }),
                None => None,
            }
        }
    };

    debug!(
        login = %identity.login,
        project = %project.id,
        sprint = ?sprint.as_ref().map(|s| s.id.as_str()),
        "Filters resolved"
    );
    resolution.filters.project = Some(project);
    resolution.filters.sprint = sprint;
    resolution
}

/// Requested sprint when it belongs to the inventory, otherwise the first
/// active sprint
fn pick_sprint(sprints: &SprintInventory, requested: Option<&str>) -> Option<SprintRef> {
    if let Some(id) = requested {
        if let Some(found) = sprints.find(id) {
            return Some(found.clone());
        }
        warn!(sprint = %id, "Requested sprint is not open in this project, using default");
    }
    sprints.first_active().cloned()
}
