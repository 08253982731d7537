//! Issue tracker integrations
//!
//! Provider adapters for Jira and GitHub, split into four capabilities that
//! the rest of the crate programs against:
//!
//! - [`Authenticator`]: turn a login attempt into an [`Identity`]
//! - [`FilterResolver`]: resolve project/sprint filters against live provider state
//! - [`SearchEngine`]: run a paginated search and normalize the results
//! - [`FlagMutator`]: add the "printed" label to a selection of issues
//!
//! # Request Flow
//!
//! 1. **Login**: the caller authenticates once and keeps the returned identity
//! 2. **Filters**: project and sprint inventories are fetched, the request is
//!    reconciled with the saved filter state
//! 3. **Search**: pages are fetched one after another and normalized into an
//!    [`IssueCollection`](crate::model::IssueCollection)
//! 4. **Flag**: printed issues are labelled with a bounded number of
//!    concurrent requests
//!
//! Every call after login receives the identity explicitly; adapters keep no
//! per-user state.

pub mod client;
pub mod filters;
pub mod flag;
pub mod github;
pub mod jira;
pub mod normalizer;
pub mod pagination;
pub mod registry;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::{AuthError, MutationError, QueryError};
use crate::model::{
    FilterRequest, FilterSet, Identity, LoginAttempt, ProjectInventory, ProjectRef,
    SprintInventory,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

pub use client::{HttpProviderClient, ProviderClient, ProviderRequest, ProviderResponse};
pub use filters::FilterResolution;
pub use github::GitHubProvider;
pub use jira::JiraProvider;
pub use normalizer::IssueNormalizer;
pub use registry::{ProviderBundle, ProviderRegistry};
pub use search::{SearchMode, SearchOutcome};

/// Verifies credentials against the provider's "who am I" endpoint
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Identifier of the provider instance this authenticator talks to
    fn provider_id(&self) -> &str;

    async fn authenticate(&self, attempt: &LoginAttempt) -> Result<Identity, AuthError>;
}

/// Fetches project and sprint inventories and reconciles filter requests
/// with them
#[async_trait]
pub trait FilterResolver: Send + Sync {
    /// All projects visible to the user, in natural name order
    async fn projects(&self, identity: &Identity) -> crate::Result<ProjectInventory>;

    /// Active and future sprints of a project
    async fn sprints(
        &self,
        identity: &Identity,
        project: &ProjectRef,
    ) -> crate::Result<SprintInventory>;

    /// Resolve a filter request against live provider state.
    ///
    /// Never fails outright: fetch errors are reported in
    /// [`FilterResolution::error`] next to whatever could be resolved.
    async fn resolve_filters(
        &self,
        identity: &Identity,
        request: &FilterRequest,
        saved: &FilterSet,
    ) -> FilterResolution {
        filters::resolve(self, identity, request, saved).await
    }
}

/// Runs searches and normalizes the results
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(
        &self,
        identity: &Identity,
        mode: &SearchMode,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome, QueryError>;
}

/// Marks issues as printed on the provider
#[async_trait]
pub trait FlagMutator: Send + Sync {
    /// Add the printed label to every issue in `issue_ids`.
    ///
    /// Each issue is updated independently; the error lists the issues that
    /// could not be labelled. Flagging an already flagged issue is a no-op.
    async fn flag_printed(
        &self,
        identity: &Identity,
        issue_ids: &BTreeSet<String>,
    ) -> Result<(), MutationError>;
}
