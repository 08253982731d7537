//! CLI command definitions
//!
//! All CLI structs and subcommand enums are defined here.

use clap::{Args, Parser, Subcommand};

/// Scrumboard - print sprint boards from Jira and GitHub issues
#[derive(Parser, Debug)]
#[command(name = "scrumboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.config/scrumboard/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Provider id to use (default: the configured default provider)
    #[arg(short, long, global = true)]
    pub provider: Option<String>,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Credentials sent to the provider
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Provider login (Jira username, GitHub login)
    #[arg(short, long, env = "SCRUMBOARD_USER")]
    pub user: String,

    /// Password or API token
    #[arg(long, env = "SCRUMBOARD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Filter parameters of a request
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Project id (Jira board id, GitHub owner/repo)
    #[arg(long)]
    pub project: Option<String>,

    /// Sprint id (Jira sprint id, GitHub owner/repo:milestone)
    #[arg(long)]
    pub sprint: Option<String>,

    /// Raw provider query (JQL, GitHub search syntax)
    #[arg(short, long)]
    pub query: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check credentials and show the authenticated user
    Login {
        #[command(flatten)]
        login: LoginArgs,
    },

    /// Resolve and remember project/sprint filters
    Filters {
        #[command(flatten)]
        login: LoginArgs,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Search issues (selected keys, sprint or raw query)
    Search {
        #[command(flatten)]
        login: LoginArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Issue keys to fetch (repeatable); takes precedence over filters
        #[arg(short, long = "key")]
        keys: Vec<String>,
    },

    /// Label issues as printed
    Flag {
        #[command(flatten)]
        login: LoginArgs,

        /// Issue ids (Jira keys or ids, GitHub owner/repo#number)
        #[arg(required = true)]
        issues: Vec<String>,
    },

    /// List configured providers
    Providers,

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create a configuration file
    Init {
        /// Jira base URL
        #[arg(long)]
        jira: Option<String>,

        /// GitHub or GitHub Enterprise base URL
        #[arg(long)]
        github: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration
    Show,

    /// Check the configuration for problems
    Validate,
}
