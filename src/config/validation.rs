//! Configuration validation
//!
//! Validates Scrumboard configuration for correctness:
//! - At least one provider, no duplicate ids
//! - Valid base URLs
//! - Non-empty label and field names
//! - A default provider that is actually registered

use super::provider::ProviderConfig;
use super::scrumboard_config::ScrumboardConfig;
use crate::ScrumboardError;
use std::collections::HashSet;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub provider: Option<String>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: None,
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] {}: {}", provider, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a Scrumboard configuration
pub fn validate_config(config: &ScrumboardConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.providers.is_empty() {
        errors.push(ValidationError::new(
            "providers",
            "At least one provider must be defined",
        ));
    }

    let mut seen_ids = HashSet::new();
    for provider in &config.providers {
        if !seen_ids.insert(&provider.id) {
            errors.push(ValidationError::new(
                "providers",
                format!("Duplicate provider id: {}", provider.id),
            ));
        }
    }

    for provider in &config.providers {
        if let Err(mut provider_errors) = validate_provider(provider) {
            errors.append(&mut provider_errors);
        }
    }

    if let Some(ref default) = config.default_provider {
        if config.get_provider(default).is_none() {
            errors.push(ValidationError::new(
                "default_provider",
                format!(
                    "Default provider '{}' is not registered. Known: {}",
                    default,
                    config.provider_ids().join(", ")
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a single provider entry
fn validate_provider(provider: &ProviderConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if provider.id.trim().is_empty() {
        errors.push(ValidationError::new("id", "Provider id cannot be empty"));
    }

    if !is_valid_http_url(&provider.url) {
        errors.push(
            ValidationError::new("url", format!("Invalid provider URL: {}", provider.url))
                .with_provider(&provider.id),
        );
    }

    let labels = [
        ("labels.printed", &provider.labels.printed),
        ("labels.proof_of_concept", &provider.labels.proof_of_concept),
        ("labels.user_story", &provider.labels.user_story),
        ("labels.subtask", &provider.labels.subtask),
        ("fields.complexity", &provider.fields.complexity),
        ("fields.business_value", &provider.fields.business_value),
    ];
    for (field, value) in labels {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "Cannot be empty").with_provider(&provider.id));
        }
    }

    if provider.labels.printed.contains('"') {
        errors.push(
            ValidationError::new("labels.printed", "Printed label cannot contain quotes")
                .with_provider(&provider.id),
        );
    }

    if provider.flag_concurrency == 0 {
        errors.push(
            ValidationError::new("flag_concurrency", "Must be greater than 0")
                .with_provider(&provider.id),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.trim_matches('/').is_empty())
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &ScrumboardConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        ScrumboardError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
