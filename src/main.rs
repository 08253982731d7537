//! Scrumboard - issue tracker integration layer
//!
//! Main entry point for the Scrumboard CLI.

mod commands;

use anyhow::Context;
use clap::Parser;
use commands::{Cli, Commands, ConfigCommands, FilterArgs, LoginArgs};
use scrumboard::config::{validate_config, validate_config_result, ProviderConfig, ScrumboardConfig};
use scrumboard::integrations::{ProviderBundle, ProviderRegistry, SearchMode, SearchOutcome};
use scrumboard::model::{FilterRequest, Identity, LoginAttempt, Task};
use scrumboard::session::{FileFilterStore, FilterSession};
use scrumboard::{Result, ScrumboardError};
use std::collections::BTreeSet;
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    // Initialize logging
    if let Err(e) = scrumboard::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Config commands work without a valid configuration
    if let Commands::Config(ref config_cmd) = cli.command {
        return handle_config_command(config_cmd, &cli.config);
    }

    let config = load_config(&cli.config)?;
    validate_config_result(&config)?;
    tracing::info!(providers = config.providers.len(), "Configuration loaded");

    if let Commands::Providers = cli.command {
        print_providers(&config);
        return Ok(());
    }

    let provider_id = config
        .select_provider(cli.provider.as_deref())
        .ok_or_else(|| {
            ScrumboardError::Config(
                "No provider selected. Pass --provider or set default_provider in the config."
                    .to_string(),
            )
        })?
        .to_string();
    let registry = ProviderRegistry::from_config(&config)?;
    let provider = registry.for_provider(&provider_id)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match cli.command {
            Commands::Login { login } => {
                let identity = authenticate(&provider, &login).await?;
                print_identity(&identity, cli.json)
            }
            Commands::Filters { login, filters } => {
                let identity = authenticate(&provider, &login).await?;
                let session =
                    FilterSession::new(FileFilterStore::new(&config.session.filter_store));
                let resolution = session
                    .resolve(provider.filters.as_ref(), &identity, &filter_request(filters))
                    .await?;
                if let Some(ref e) = resolution.error {
                    eprintln!("Warning: {}", e);
                }

                if cli.json {
                    let value = serde_json::json!({
                        "filters": resolution.filters,
                        "projects": resolution.projects,
                        "sprints": resolution.sprints,
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                } else {
                    print_filters(&resolution);
                }
                Ok(())
            }
            Commands::Search {
                login,
                filters,
                keys,
            } => {
                let identity = authenticate(&provider, &login).await?;
                let session =
                    FilterSession::new(FileFilterStore::new(&config.session.filter_store));
                let resolution = session
                    .resolve(provider.filters.as_ref(), &identity, &filter_request(filters))
                    .await?;
                if let Some(ref e) = resolution.error {
                    eprintln!("Warning: {}", e);
                }

                let mode = SearchMode::select(&keys, &resolution.filters)?;
                let cancel = CancellationToken::new();
                let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

                let outcome = provider.search.search(&identity, &mode, &cancel).await;
                watcher.abort();
                print_outcome(&outcome?, cli.json)
            }
            Commands::Flag { login, issues } => {
                let identity = authenticate(&provider, &login).await?;
                let issue_ids: BTreeSet<String> = issues.into_iter().collect();
                provider.flags.flag_printed(&identity, &issue_ids).await?;
                println!("Flagged {} issue(s) as printed", issue_ids.len());
                Ok(())
            }
            Commands::Providers | Commands::Config(_) => Ok(()),
        }
    })
}

fn load_config(path: &Option<String>) -> Result<ScrumboardConfig> {
    if let Some(path) = path {
        let config = ScrumboardConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?;
        return Ok(config);
    }

    match ScrumboardConfig::load_default() {
        Ok(config) => Ok(config),
        Err(ScrumboardError::Config(msg)) if msg.contains("Config file not found") => {
            Err(ScrumboardError::Config(
                "No configuration found. Run 'scrumboard config init --jira <url>' first."
                    .to_string(),
            ))
        }
        Err(e) => Err(e),
    }
}

async fn authenticate(provider: &ProviderBundle, login: &LoginArgs) -> Result<Identity> {
    let attempt = LoginAttempt::new(&login.user, &login.password);
    Ok(provider.authenticator.authenticate(&attempt).await?)
}

fn filter_request(args: FilterArgs) -> FilterRequest {
    FilterRequest {
        project: args.project,
        sprint: args.sprint,
        raw_query: args.query,
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("Cancelling search...");
        cancel.cancel();
    }
}

fn handle_config_command(cmd: &ConfigCommands, config_path: &Option<String>) -> Result<()> {
    let path = config_path
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(ScrumboardConfig::default_path);

    match cmd {
        ConfigCommands::Init {
            jira,
            github,
            force,
        } => {
            if path.exists() && !force {
                return Err(ScrumboardError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }

            let mut config = ScrumboardConfig::new();
            if let Some(url) = jira {
                config.add_provider(ProviderConfig::jira(url));
            }
            if let Some(url) = github {
                config.add_provider(ProviderConfig::github(url));
            }
            if config.providers.is_empty() {
                return Err(ScrumboardError::Config(
                    "Pass at least one of --jira <url> or --github <url>".to_string(),
                ));
            }
            config.default_provider = config.providers.first().map(|p| p.id.clone());

            config
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Created {}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        ConfigCommands::Validate => {
            let config = load_config(config_path)?;
            match validate_config(&config) {
                Ok(()) => {
                    println!("Configuration is valid");
                    Ok(())
                }
                Err(errors) => {
                    for error in &errors {
                        println!("  {}", error);
                    }
                    Err(ScrumboardError::Config(format!(
                        "{} problem(s) found",
                        errors.len()
                    )))
                }
            }
        }
    }
}

fn print_providers(config: &ScrumboardConfig) {
    let default = config.select_provider(None);
    for provider in &config.providers {
        let marker = if Some(provider.id.as_str()) == default {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<16} {:<8} {}",
            marker, provider.id, provider.kind, provider.url
        );
    }
}

fn print_identity(identity: &Identity, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(identity)?);
        return Ok(());
    }
    println!("Logged in to {} as {}", identity.provider_id, identity.login);
    println!("  Name:  {}", identity.display_name);
    if let Some(ref email) = identity.email {
        println!("  Email: {}", email);
    }
    Ok(())
}

fn print_filters(resolution: &scrumboard::integrations::FilterResolution) {
    let selected_project = resolution.filters.project.as_ref().map(|p| p.id.as_str());
    let selected_sprint = resolution.filters.sprint.as_ref().map(|s| s.id.as_str());

    println!("Projects:");
    for project in resolution.projects.iter() {
        let marker = if Some(project.id.as_str()) == selected_project {
            "*"
        } else {
            " "
        };
        println!("  {} {:<12} {}", marker, project.id, project.name);
    }

    for (title, sprints) in [
        ("Active sprints:", &resolution.sprints.active),
        ("Future sprints:", &resolution.sprints.future),
    ] {
        if sprints.is_empty() {
            continue;
        }
        println!("{}", title);
        for sprint in sprints {
            let marker = if Some(sprint.id.as_str()) == selected_sprint {
                "*"
            } else {
                " "
            };
            println!("  {} {:<12} {}", marker, sprint.id, sprint.name);
        }
    }
}

fn print_outcome(outcome: &SearchOutcome, json: bool) -> Result<()> {
    if let Some(ref e) = outcome.error {
        eprintln!("Warning: {}", e);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.issues)?);
        return Ok(());
    }

    println!("Found {} issues:", outcome.issues.len());
    println!();
    for task in outcome.issues.tasks() {
        print_task_summary(task);
    }
    Ok(())
}

fn print_task_summary(task: &Task) {
    let mut flags = Vec::new();
    if task.is_user_story {
        flags.push("story".to_string());
    }
    if task.is_proof_of_concept {
        flags.push("poc".to_string());
    }
    if task.is_printed {
        flags.push("printed".to_string());
    }
    if let Some(parent) = task.parent_task_id() {
        flags.push(format!("sub of {}-{}", task.project, parent));
    }
    if let Some(roi) = task.return_on_investment {
        flags.push(format!("roi {:.1}", roi));
    }

    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };
    println!("{:<14} {}{}", task.id, task.title, flags);
}
