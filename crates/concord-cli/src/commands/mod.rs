pub mod agreement;
pub mod codebook;
pub mod diff;
pub mod import;
pub mod init;
pub mod merge;
pub mod status;

use clap::Args;
use concord_core::model::LinkCompareBehavior;
use concord_engine::DiffOptions;
use concord_store::SetStatus;

use crate::config::Settings;

/// Flags shared by every command that diffs documents
#[derive(Debug, Clone, Args)]
pub struct DiffFlags {
    /// Layer to compare (repeatable; defaults to the layers of concord.toml)
    #[arg(long = "layer")]
    pub layers: Vec<String>,

    /// target_only or include_role
    #[arg(long)]
    pub link_compare: Option<LinkCompareBehavior>,

    /// Status a set must have to take part
    #[arg(long)]
    pub required_status: Option<SetStatus>,
}

impl DiffFlags {
    pub fn options(&self, settings: &Settings) -> Result<DiffOptions, Box<dyn std::error::Error>> {
        let layers = settings.layers(&self.layers)?;
        Ok(DiffOptions::new(layers)
            .with_link_compare(settings.link_compare(self.link_compare)?)
            .with_required_status(settings.required_status(self.required_status)?))
    }
}

/// Warn about sources left out of a computation
pub fn print_exclusions(excluded: &[concord_engine::ExcludedSource]) {
    for source in excluded {
        eprintln!(
            "warning: excluded {} [{}]: {}",
            source.source,
            source.error.code(),
            source.error.message()
        );
    }
}
