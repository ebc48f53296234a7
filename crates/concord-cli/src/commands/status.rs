//! Annotation set status

use clap::Args;
use concord_core::model::SourceLabel;
use concord_store::SetStatus;

use crate::config::Settings;

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long)]
    pub document: String,

    /// New status for the set named by --source
    #[arg(long, requires = "source")]
    pub set: Option<SetStatus>,

    #[arg(long)]
    pub source: Option<String>,
}

pub fn execute(args: StatusArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let repo = settings.open_repository()?;

    if let Some(status) = args.set {
        let source = SourceLabel::from(args.source.unwrap_or_default());
        repo.set_status(&args.document, &source, status)?;
        println!("{} / {}: {}", args.document, source, status);
        return Ok(());
    }

    let sets = repo.list_sets(&args.document)?;
    if sets.is_empty() {
        println!("{}: no annotation sets", args.document);
        return Ok(());
    }
    println!("{:<24} {:<12} DIGEST", "SOURCE", "STATUS");
    for set in sets {
        println!(
            "{:<24} {:<12} {}",
            set.source.as_str(),
            set.status.as_str(),
            &set.digest[..12.min(set.digest.len())]
        );
    }
    Ok(())
}
