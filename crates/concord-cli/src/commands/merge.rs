//! Curation merge

use clap::Args;
use concord_core::merge::UnresolvedReason;
use concord_engine::{apply_engine_command, CurationOptions, EngineCommand, EngineCommandResult};

use super::DiffFlags;
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct MergeArgs {
    #[arg(long)]
    pub document: String,

    /// Source whose annotations seed the curation set (defaults to the first source)
    #[arg(long)]
    pub reference: Option<String>,

    /// Also merge sets that some source left out
    #[arg(long)]
    pub merge_incomplete: bool,

    #[command(flatten)]
    pub flags: DiffFlags,
}

pub fn execute(args: MergeArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let repo = settings.open_repository()?;
    let curation = CurationOptions {
        reference: settings.reference_source(args.reference),
        merge_incomplete: settings.merge_incomplete(args.merge_incomplete.then_some(true)),
    };
    let cmd = EngineCommand::Curate {
        document_id: args.document,
        diff: args.flags.options(settings)?,
        curation,
    };
    let EngineCommandResult::Curate(result) = apply_engine_command(cmd, &repo)? else {
        return Err("unexpected result for merge command".into());
    };
    super::print_exclusions(&result.excluded);

    let stats = &result.outcome.stats;
    println!(
        "Merged {} (reference {}): {} annotations, status {}",
        result.document_id,
        result.reference,
        result.outcome.curated.len(),
        result.status
    );
    println!(
        "  kept {}, added {}, removed {}, pruned links {}",
        stats.kept_from_reference, stats.added_from_other_sources, stats.removed, stats.pruned_links
    );
    for reason in [
        UnresolvedReason::Differing,
        UnresolvedReason::IncompleteNotMerged,
        UnresolvedReason::DanglingReference,
        UnresolvedReason::BrokenChain,
    ] {
        let count = result.outcome.unresolved_by(reason).count();
        if count > 0 {
            println!("  unresolved ({}): {}", reason, count);
        }
    }
    for unresolved in &result.outcome.unresolved {
        println!("  - {} [{}]", unresolved.set.position, unresolved.reason);
    }
    Ok(())
}
