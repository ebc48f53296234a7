//! Annotation set import

use clap::Args;
use concord_core::model::{AnnotationStore, SourceLabel};
use concord_store::SetStatus;
use std::path::PathBuf;

use crate::config::Settings;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// JSON file holding one serialized annotation set
    pub file: PathBuf,

    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub document: String,

    /// Display name of the document (defaults to the document id)
    #[arg(long)]
    pub name: Option<String>,

    /// Store the set under this source instead of the one in the file
    #[arg(long)]
    pub source: Option<String>,

    #[arg(long, default_value = "finished")]
    pub status: SetStatus,
}

pub fn execute(args: ImportArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&args.file)?;
    let mut store: AnnotationStore = serde_json::from_str(&content)?;
    if let Some(source) = args.source {
        store = store.relabeled(source);
    }
    if store.source() == &SourceLabel::curation() {
        return Err(format!(
            "'{}' is reserved for merged sets and cannot be imported",
            store.source()
        )
        .into());
    }

    let repo = settings.open_repository()?;
    let name = args.name.as_deref().unwrap_or(&args.document);
    repo.register_document(&args.project, &args.document, name)?;
    let digest = repo.write_store(&args.document, store.source(), &store, args.status)?;

    println!(
        "Imported {} annotations from {} into {} ({}, {})",
        store.len(),
        store.source(),
        args.document,
        args.status,
        &digest[..12.min(digest.len())]
    );
    Ok(())
}
