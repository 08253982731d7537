//! Filter session
//!
//! Keeps the last resolved project and sprint per user and provider, so a
//! search request without filters picks up where the user left off.

mod store;

pub use store::{FileFilterStore, FilterStore, MemoryFilterStore};

use crate::integrations::{FilterResolution, FilterResolver};
use crate::model::{FilterRequest, Identity};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Store key: one filter set per login and provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub login: String,
    pub provider_id: String,
}

impl SessionKey {
    pub fn new(login: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            provider_id: provider_id.into(),
        }
    }

    pub fn for_identity(identity: &Identity) -> Self {
        Self::new(&identity.login, &identity.provider_id)
    }

    fn matches(&self, login: &str, provider_id: &str) -> bool {
        self.login == login && self.provider_id == provider_id
    }
}

/// Filter resolution backed by a [`FilterStore`]
pub struct FilterSession<S: FilterStore> {
    store: S,
}

impl<S: FilterStore> FilterSession<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `request` on top of the saved filters and save the result.
    ///
    /// The resolution's own fetch error is left in the returned value; only
    /// store failures make this call fail.
    pub async fn resolve(
        &self,
        resolver: &dyn FilterResolver,
        identity: &Identity,
        request: &FilterRequest,
    ) -> Result<FilterResolution> {
        let key = SessionKey::for_identity(identity);
        let saved = self.store.load(&key)?;
        let resolution = resolver.resolve_filters(identity, request, &saved).await;
        self.store.save(&key, &resolution.filters)?;
        debug!(login = %key.login, provider = %key.provider_id, "Saved filters");
        Ok(resolution)
    }
}
