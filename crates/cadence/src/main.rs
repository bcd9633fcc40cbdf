// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cadence - conversational engagement scheduler.
//!
//! This is the binary entry point: `serve` runs the debounce sweep and the
//! follow-up poll, the other subcommands administer the shared database.

mod admin;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cadence_config::CadenceConfig;
use cadence_core::CadenceError;

/// Cadence - debounced replies and follow-up cadences for messaging conversations.
#[derive(Parser, Debug)]
#[command(name = "cadence", version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the debounce sweep and the follow-up poll until SIGTERM/Ctrl+C.
    Serve,
    /// Buffer one inbound contact message.
    Ingest {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        company: String,
        /// Contact display name.
        #[arg(long = "lead")]
        lead_name: Option<String>,
        text: String,
    },
    /// Manage companies and conversations.
    Directory {
        #[command(subcommand)]
        action: DirectoryCommand,
    },
    /// Manage follow-up cadences.
    Followup {
        #[command(subcommand)]
        action: FollowupCommand,
    },
    /// Show adapter health.
    Status,
}

#[derive(Subcommand, Debug)]
enum DirectoryCommand {
    /// Create or rename a company.
    AddCompany { id: String, name: String },
    /// Create or update a conversation.
    AddConversation {
        id: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        contact_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Hand a conversation to a human (`human`) or back to automation (`ai`).
    SupportMode { id: String, mode: String },
}

#[derive(Subcommand, Debug)]
enum FollowupCommand {
    /// Show or replace a company's follow-up config.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// List a company's follow-up statuses, soonest due first.
    Status {
        #[arg(long)]
        company: String,
    },
    /// Stop automatic follow-ups for a conversation.
    Pause { conversation: String },
    /// Restart automatic follow-ups for a conversation.
    Resume { conversation: String },
    /// Restart a conversation's cadence from the first step.
    Reset { conversation: String },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show { company: String },
    /// Replace the config with the contents of a TOML or JSON file.
    Set {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => cadence_config::load_and_validate_path(path),
        None => cadence_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            cadence_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let Some(command) = cli.command else {
        println!("cadence: use --help for available commands");
        return;
    };

    if let Err(e) = run(command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: CadenceConfig) -> Result<(), CadenceError> {
    match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Ingest {
            conversation,
            company,
            lead_name,
            text,
        } => {
            admin::ingest(
                &config,
                cadence_engine::InboundEvent {
                    conversation_id: conversation,
                    company_id: company,
                    lead_name,
                    text,
                    received_at: None,
                },
            )
            .await
        }
        Commands::Directory { action } => {
            let storage = admin::open_storage(&config).await?;
            match action {
                DirectoryCommand::AddCompany { id, name } => {
                    admin::add_company(&storage, id, name).await
                }
                DirectoryCommand::AddConversation {
                    id,
                    company,
                    contact_name,
                    phone,
                } => admin::add_conversation(&storage, id, company, contact_name, phone).await,
                DirectoryCommand::SupportMode { id, mode } => {
                    admin::set_support_mode(&storage, &id, &mode).await
                }
            }
        }
        Commands::Followup { action } => {
            let tracker = admin::open_tracker(&config).await?;
            match action {
                FollowupCommand::Config {
                    action: ConfigCommand::Show { company },
                } => admin::print_json(&tracker.get_config(&company).await?),
                FollowupCommand::Config {
                    action: ConfigCommand::Set { file },
                } => {
                    let follow_up = admin::read_follow_up_config(&file)?;
                    tracker.save_config(&follow_up).await?;
                    admin::print_json(&follow_up)
                }
                FollowupCommand::Status { company } => {
                    admin::print_json(&tracker.list_statuses(&company).await?)
                }
                FollowupCommand::Pause { conversation } => {
                    admin::print_status(&conversation, tracker.pause(&conversation).await?)
                }
                FollowupCommand::Resume { conversation } => {
                    admin::print_status(&conversation, tracker.resume(&conversation).await?)
                }
                FollowupCommand::Reset { conversation } => {
                    admin::print_status(&conversation, tracker.reset(&conversation).await?)
                }
            }
        }
        Commands::Status => serve::run_status(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_config_flag_follows_subcommand() {
        let cli = Cli::try_parse_from([
            "cadence",
            "followup",
            "pause",
            "conv-1",
            "--config",
            "/tmp/cadence.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/cadence.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Followup {
                action: FollowupCommand::Pause { .. }
            })
        ));
    }

    #[test]
    fn ingest_takes_text_positionally() {
        let cli = Cli::try_parse_from([
            "cadence",
            "ingest",
            "--conversation",
            "conv-1",
            "--company",
            "co-1",
            "oi, tudo bem?",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Ingest {
                text, lead_name, ..
            }) => {
                assert_eq!(text, "oi, tudo bem?");
                assert!(lead_name.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = cadence_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert!(config.debounce.enabled);
    }
}
