//! Provider registry
//!
//! Maps configured provider ids to their capability bundles. Lookups of
//! unknown ids fail; there is no fallback provider.

use super::client::{HttpProviderClient, ProviderClient};
use super::github::GitHubProvider;
use super::jira::JiraProvider;
use super::{Authenticator, FilterResolver, FlagMutator, SearchEngine};
use crate::config::{ProviderConfig, ProviderKind, ScrumboardConfig};
use crate::{Result, ScrumboardError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// The four capabilities of one provider instance
#[derive(Clone)]
pub struct ProviderBundle {
    pub provider_id: String,
    pub kind: ProviderKind,
    pub authenticator: Arc<dyn Authenticator>,
    pub filters: Arc<dyn FilterResolver>,
    pub search: Arc<dyn SearchEngine>,
    pub flags: Arc<dyn FlagMutator>,
}

impl ProviderBundle {
    /// Bundle a provider implementing every capability
    pub fn from_provider<P>(provider_id: impl Into<String>, kind: ProviderKind, provider: P) -> Self
    where
        P: Authenticator + FilterResolver + SearchEngine + FlagMutator + 'static,
    {
        let provider = Arc::new(provider);
        Self {
            provider_id: provider_id.into(),
            kind,
            authenticator: provider.clone(),
            filters: provider.clone(),
            search: provider.clone(),
            flags: provider,
        }
    }

    fn for_config(config: &ProviderConfig, client: Arc<dyn ProviderClient>) -> Self {
        match config.kind {
            ProviderKind::Jira => Self::from_provider(
                &config.id,
                config.kind,
                JiraProvider::new(config.clone(), client),
            ),
            ProviderKind::GitHub => Self::from_provider(
                &config.id,
                config.kind,
                GitHubProvider::new(config.clone(), client),
            ),
        }
    }
}

impl std::fmt::Debug for ProviderBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBundle")
            .field("provider_id", &self.provider_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Configured providers by id
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderBundle>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured provider on top of a shared HTTP client
    pub fn from_config(config: &ScrumboardConfig) -> Result<Self> {
        let client: Arc<dyn ProviderClient> = Arc::new(HttpProviderClient::new()?);
        Ok(Self::with_client(config, client))
    }

    /// Build every configured provider on top of the given client
    pub fn with_client(config: &ScrumboardConfig, client: Arc<dyn ProviderClient>) -> Self {
        let mut registry = Self::new();
        for provider in &config.providers {
            registry.register(ProviderBundle::for_config(provider, client.clone()));
        }
        registry
    }

    /// Add or replace a provider
    pub fn register(&mut self, bundle: ProviderBundle) {
        debug!(provider = %bundle.provider_id, kind = %bundle.kind, "Registered provider");
        self.providers.insert(bundle.provider_id.clone(), bundle);
    }

    pub fn for_provider(&self, provider_id: &str) -> Result<ProviderBundle> {
        self.providers
            .get(provider_id)
            .cloned()
            .ok_or_else(|| ScrumboardError::UnknownProvider(provider_id.to_string()))
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
