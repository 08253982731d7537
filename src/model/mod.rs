//! Domain model
//!
//! Value objects exchanged with the integration layer:
//! - [`Identity`] / [`LoginAttempt`]: who is calling the provider
//! - [`FilterSet`] and inventories: what the user is looking at
//! - [`Task`] / [`IssueCollection`]: normalized search results

mod filters;
mod identity;
mod task;

pub use filters::{
    natural_cmp, FilterRequest, FilterSet, ProjectInventory, ProjectRef, SprintInventory,
    SprintRef, SprintState,
};
pub use identity::{Credential, Identity, LoginAttempt};
pub use task::{return_on_investment, IssueCollection, Task, TaskKind};
