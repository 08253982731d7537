//! Configuration system
//!
//! Loads ~/.config/scrumboard/config.yaml with support for:
//! - Multiple issue-tracking providers (Jira, GitHub)
//! - Per-provider label names and custom field identifiers
//! - Session filter store location

mod provider;
mod scrumboard_config;
pub mod validation;

pub use provider::{FieldConfig, LabelConfig, ProviderConfig, ProviderKind};
pub use scrumboard_config::{ScrumboardConfig, SessionConfig};
pub use validation::{validate_config, validate_config_result, ValidationError};
