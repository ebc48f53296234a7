//! Document diff

use clap::Args;
use concord_core::diff::render_human_summary;
use concord_engine::{apply_engine_command, EngineCommand, EngineCommandResult, ExclusionReport};
use serde::Serialize;

use super::DiffFlags;
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[arg(long)]
    pub document: String,

    #[command(flatten)]
    pub flags: DiffFlags,

    /// Print the full diff as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct DiffReport<'a> {
    document_id: &'a str,
    diff: &'a concord_core::DiffResult,
    excluded: Vec<ExclusionReport>,
}

pub fn execute(args: DiffArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let repo = settings.open_repository()?;
    let cmd = EngineCommand::Diff {
        document_id: args.document,
        options: args.flags.options(settings)?,
    };
    let EngineCommandResult::Diff(result) = apply_engine_command(cmd, &repo)? else {
        return Err("unexpected result for diff command".into());
    };

    if args.json {
        let report = DiffReport {
            document_id: &result.document_id,
            diff: &result.diff,
            excluded: result.excluded.iter().map(ExclusionReport::from).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print!("{}", render_human_summary(&result.diff));
    super::print_exclusions(&result.excluded);
    Ok(())
}
