//! Project agreement

use clap::Args;
use concord_core::agreement::{
    interpretation, render_agreement_csv, render_score_csv, FeatureId, PairwiseAgreementResult,
};
use concord_engine::{apply_engine_command, AgreementOptions, EngineCommand, EngineCommandResult};

use super::DiffFlags;
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct AgreementArgs {
    #[arg(long)]
    pub project: String,

    /// Feature to compare, as LAYER.FEATURE
    #[arg(long)]
    pub feature: FeatureId,

    /// percentage, cohen_kappa or krippendorff_alpha
    #[arg(long)]
    pub measure: Option<String>,

    /// Count units where one source is absent
    #[arg(long)]
    pub include_incomplete: bool,

    #[command(flatten)]
    pub flags: DiffFlags,

    /// Print one CSV row per source pair
    #[arg(long, conflicts_with = "units")]
    pub csv: bool,

    /// Print one CSV row per compared unit
    #[arg(long)]
    pub units: bool,
}

pub fn execute(args: AgreementArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let repo = settings.open_repository()?;
    let include_flag = args.include_incomplete.then_some(false);
    let agreement = AgreementOptions {
        feature: args.feature,
        measure: settings.measure(args.measure),
        exclude_incomplete: settings.exclude_incomplete(include_flag),
    };
    let cmd = EngineCommand::Agreement {
        project_id: args.project.clone(),
        diff: args.flags.options(settings)?,
        agreement,
    };
    let EngineCommandResult::Agreement(result) = apply_engine_command(cmd, &repo)? else {
        return Err("unexpected result for agreement command".into());
    };

    for (document_id, excluded) in &result.excluded {
        eprintln!(
            "warning: {}: excluded {} [{}]",
            document_id,
            excluded.source,
            excluded.error.code()
        );
    }
    for skipped in &result.skipped {
        eprintln!(
            "warning: skipped {} [{}]",
            skipped.document_id,
            skipped.error.code()
        );
    }

    let Some(combined) = result.combined.as_ref() else {
        println!("{}: no documents with eligible sources", args.project);
        return Ok(());
    };

    if args.csv {
        print!("{}", render_score_csv(combined));
    } else if args.units {
        print!("{}", render_agreement_csv(combined));
    } else {
        print!("{}", render_table(combined, result.per_document.len()));
    }
    Ok(())
}

fn render_table(result: &PairwiseAgreementResult, documents: usize) -> String {
    let mut out = format!(
        "{} ({}, {} documents)\n",
        result.feature, result.measure, documents
    );
    for pair in &result.pairs {
        let score = match pair.score {
            Some(s) => format!("{:.4}  {}", s, interpretation(s)),
            None => "n/a".to_string(),
        };
        out.push_str(&format!(
            "{:<16} {:<16} {:>6} units  {}\n",
            pair.source_a.as_str(),
            pair.source_b.as_str(),
            pair.table.total(),
            score
        ));
    }
    out
}
