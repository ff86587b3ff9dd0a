//! MARKS CLI
//!
//! Command-line interface for MARKS - ordered sections of favorite links.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use marks_core::{
    Board, Config, Notification, NotificationKind, PersistenceError, SqliteStore, Store, StoreError,
};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "marks")]
#[command(about = "MARKS - Ordered sections of favorite links")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Do not ask for confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sections
    Section {
        #[command(subcommand)]
        command: SectionCommands,
    },
    /// Add a favorite to a section
    #[command(alias = "create")]
    Add {
        /// URL to save (https:// is assumed when no scheme is given)
        url: String,
        /// Section title, ID or ID prefix
        #[arg(short, long)]
        section: String,
        /// Title (suggested from the URL when omitted)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Icon URL (derived from the URL host when omitted)
        #[arg(long)]
        icon: Option<String>,
    },
    /// Edit a favorite
    Edit {
        /// Favorite ID (full UUID or prefix)
        id: String,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Move to the end of this section
        #[arg(short, long)]
        section: Option<String>,
        /// Icon URL, or "none" to clear it
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a favorite
    #[command(alias = "delete")]
    Rm {
        /// Favorite ID (full UUID or prefix)
        id: String,
    },
    /// List favorites grouped by section
    #[command(alias = "ls")]
    List {
        /// Only this section (title, ID or ID prefix)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Show favorite details
    Show {
        /// Favorite ID (full UUID or prefix)
        id: String,
    },
    /// Move a favorite to the position of another favorite
    Move {
        /// Favorite to move
        id: String,
        /// Favorite whose position it takes
        #[arg(long)]
        onto: String,
    },
    /// Search favorites by title or URL
    Search {
        /// Search query
        query: String,
    },
    /// Open a favorite in the browser
    Open {
        /// Favorite ID (full UUID or prefix)
        id: String,
    },
    /// Export favorites as JSON
    Export {
        /// Output file (stdout when omitted)
        file: Option<PathBuf>,
    },
    /// Import favorites from JSON
    Import {
        /// File with a JSON array of {section, title, url}
        file: PathBuf,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum SectionCommands {
    /// List sections in order
    #[command(alias = "ls")]
    List,
    /// Create a section at the end
    #[command(alias = "create")]
    Add {
        title: String,
        /// Background color (#rrggbb)
        #[arg(long)]
        bg: Option<String>,
        /// Text color (#rrggbb)
        #[arg(long)]
        fg: Option<String>,
    },
    /// Edit a section
    Edit {
        /// Section title, ID or ID prefix
        id: String,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(long)]
        bg: Option<String>,
        #[arg(long)]
        fg: Option<String>,
    },
    /// Delete a section and all its favorites
    #[command(alias = "delete")]
    Rm {
        /// Section title, ID or ID prefix
        id: String,
    },
    /// Move a section to the position of another section
    Move {
        id: String,
        #[arg(long)]
        onto: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, toast_ttl_ms, toast_limit, default_background, default_text)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let output =
        Output::new(OutputFormat::from_flags(cli.json, cli.quiet)).with_assume_yes(cli.yes);

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let result = execute(cli.command, &output).await;
    if let Some(hint) = result.as_ref().err().and_then(recovery_hint) {
        eprintln!("Hint: {}", hint);
    }
    result
}

async fn execute(command: Commands, output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let remote = SqliteStore::open(&config).context("Failed to open database")?;
    let mut board = Board::new(Store::new(remote), &config);
    board.load().await.context("Failed to load data")?;

    output.print_notifications(&load_notices(board.take_notifications()));

    let result = run(command, &mut board, output).await;

    output.print_notifications(&board.take_notifications());
    result
}

async fn run(command: Commands, board: &mut Board, output: &Output) -> Result<()> {
    match command {
        Commands::Section { command } => handle_section_command(command, board, output).await,
        Commands::Add {
            url,
            section,
            title,
            icon,
        } => commands::favorite::add(board, url, section, title, icon, output).await,
        Commands::Edit {
            id,
            title,
            url,
            section,
            icon,
        } => commands::favorite::edit(board, id, title, url, section, icon, output).await,
        Commands::Rm { id } => commands::favorite::delete(board, id, output).await,
        Commands::List { section } => commands::favorite::list(board, section, output),
        Commands::Show { id } => commands::favorite::show(board, id, output),
        Commands::Move { id, onto } => commands::favorite::move_onto(board, id, onto, output).await,
        Commands::Search { query } => commands::favorite::search(board, query, output),
        Commands::Open { id } => commands::favorite::open(board, id, output),
        Commands::Export { file } => commands::transfer::export(board, file, output),
        Commands::Import { file } => commands::transfer::import(board, file, output).await,
        Commands::Config { .. } => unreachable!(), // Handled in main
    }
}

async fn handle_section_command(
    command: SectionCommands,
    board: &mut Board,
    output: &Output,
) -> Result<()> {
    match command {
        SectionCommands::List => commands::section::list(board, output),
        SectionCommands::Add { title, bg, fg } => {
            commands::section::add(board, title, bg, fg, output).await
        }
        SectionCommands::Edit { id, title, bg, fg } => {
            commands::section::edit(board, id, title, bg, fg, output).await
        }
        SectionCommands::Rm { id } => commands::section::delete(board, id, output).await,
        SectionCommands::Move { id, onto } => {
            commands::section::move_onto(board, id, onto, output).await
        }
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Recovery suggestion for the first store error in the chain
fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<StoreError>() {
            e.recovery_suggestion()
        } else {
            cause
                .downcast_ref::<PersistenceError>()
                .and_then(|e| e.recovery_suggestion())
        }
    })
}

/// Notices from loading worth showing before a one-shot command
///
/// Success notices are dropped; warnings such as skipped orphans are kept.
fn load_notices(notifications: Vec<Notification>) -> Vec<Notification> {
    notifications
        .into_iter()
        .filter(|n| n.kind != NotificationKind::Success)
        .collect()
}

/// Log to stderr, filtered by MARKS_LOG or RUST_LOG (default: warn)
fn init_logging() {
    let env_filter = EnvFilter::try_from_env("MARKS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_move() {
        let cli = Cli::try_parse_from(["marks", "move", "ab12", "--onto", "cd34"]).unwrap();
        match cli.command {
            Commands::Move { id, onto } => {
                assert_eq!(id, "ab12");
                assert_eq!(onto, "cd34");
            }
            _ => panic!("expected move"),
        }
    }

    #[test]
    fn test_parse_section_add_with_colors() {
        let cli = Cli::try_parse_from([
            "marks", "--json", "section", "add", "Work", "--bg", "#000000",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Section {
                command: SectionCommands::Add { title, bg, fg },
            } => {
                assert_eq!(title, "Work");
                assert_eq!(bg.as_deref(), Some("#000000"));
                assert!(fg.is_none());
            }
            _ => panic!("expected section add"),
        }
    }

    #[test]
    fn test_load_notices_keep_warnings_and_errors() {
        let mut notifier = marks_core::Notifier::default();
        notifier.success("Data loaded");
        notifier.warning("Skipped 2 favorites without a section");
        notifier.error("Failed to load data");

        let messages: Vec<String> = load_notices(notifier.drain())
            .into_iter()
            .map(|n| n.message)
            .collect();
        assert_eq!(
            messages,
            vec!["Skipped 2 favorites without a section", "Failed to load data"]
        );
    }

    #[test]
    fn test_recovery_hint_found_through_context() {
        let err = anyhow::Error::new(StoreError::from(PersistenceError::Unavailable(
            "disk gone".to_string(),
        )))
        .context("Failed to load data");
        assert_eq!(
            recovery_hint(&err),
            Some("Check the data directory and try again.")
        );

        let plain = anyhow::anyhow!("Nothing to change");
        assert_eq!(recovery_hint(&plain), None);
    }

    #[test]
    fn test_add_requires_section() {
        assert!(Cli::try_parse_from(["marks", "add", "github.com"]).is_err());
    }
}
