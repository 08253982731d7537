//! Scrumboard - issue tracker integration layer
//!
//! Scrumboard prints physical sprint boards from the issues of an external
//! tracker. This crate is the part that talks to the tracker: it logs users
//! in, resolves project/sprint filters against live provider state, runs
//! paginated searches, normalizes issues into printable tasks and labels
//! printed issues back on the provider.
//!
//! # Architecture
//!
//! - **model**: Identity, filter state and the normalized task model
//! - **config**: Provider configuration (YAML) and validation
//! - **integrations**: Provider adapters (Jira, GitHub) behind capability traits
//! - **session**: Saved filter state per user and provider
//! - **logging**: tracing subscriber setup

pub mod config;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod model;
pub mod session;

// Re-exports
pub use error::{Result, ScrumboardError};
