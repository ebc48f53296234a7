//! Codebook ordering

use clap::{Args, Subcommand};
use concord_core::ordering::ProjectOrderLocks;

use crate::config::Settings;

#[derive(Debug, Args)]
pub struct CodebookArgs {
    #[arg(long)]
    pub project: String,

    #[command(subcommand)]
    pub command: CodebookCommand,
}

#[derive(Debug, Subcommand)]
pub enum CodebookCommand {
    /// Append a codebook to the project order
    Add { name: String },
    /// List codebooks in order
    List,
    /// Swap the positions of two codebooks
    Swap { a: String, b: String },
}

pub fn execute(args: CodebookArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let repo = settings.open_repository()?;
    match args.command {
        CodebookCommand::Add { name } => {
            let codebook = repo.add_codebook(&args.project, &name)?;
            println!("{} {}", codebook.ordinal, codebook.name);
        }
        CodebookCommand::List => {
            for codebook in repo.list_codebooks(&args.project)? {
                println!("{} {}", codebook.ordinal, codebook.name);
            }
        }
        CodebookCommand::Swap { a, b } => {
            let locks = ProjectOrderLocks::new();
            let (ordinal_a, ordinal_b) =
                repo.swap_codebook_ordinals(&locks, &args.project, &a, &b)?;
            println!("{} {}\n{} {}", ordinal_a, a, ordinal_b, b);
        }
    }
    Ok(())
}
