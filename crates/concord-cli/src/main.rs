//! Concord CLI
//!
//! Command-line interface for cross-annotator diff, agreement and curation

use clap::{Parser, Subcommand};
use concord_core::logging_facility;

mod commands;
mod config;

use config::{GlobalArgs, Settings};

#[derive(Debug, Parser)]
#[command(name = "concord")]
#[command(about = "Concord - annotation diff, agreement and curation", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the database and content store
    Init,
    /// Import one annotation set from a JSON file
    Import(commands::import::ImportArgs),
    /// Show annotation sets of a document, or change the status of one
    Status(commands::status::StatusArgs),
    /// Diff the eligible sources of a document
    Diff(commands::diff::DiffArgs),
    /// Pairwise agreement over every document of a project
    Agreement(commands::agreement::AgreementArgs),
    /// Merge a document into its curation set
    Merge(commands::merge::MergeArgs),
    /// Codebook operations
    Codebook(commands::codebook::CodebookArgs),
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::resolve(&cli.global) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    logging_facility::init(settings.log_profile);
    tracing::debug!(
        db = %settings.db.display(),
        cas = %settings.cas.display(),
        "Resolved settings"
    );

    let result = match cli.command {
        Commands::Init => commands::init::execute(&settings),
        Commands::Import(args) => commands::import::execute(args, &settings),
        Commands::Status(args) => commands::status::execute(args, &settings),
        Commands::Diff(args) => commands::diff::execute(args, &settings),
        Commands::Agreement(args) => commands::agreement::execute(args, &settings),
        Commands::Merge(args) => commands::merge::execute(args, &settings),
        Commands::Codebook(args) => commands::codebook::execute(args, &settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
