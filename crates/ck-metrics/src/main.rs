mod bootstrap;

use anyhow::{Context, Result};
use metrics_core::settings::{AggregateArgs, Command, Settings};
use metrics_data::aggregator::{MergePolicy, RepoAggregator, RepoTable};
use metrics_data::enricher::FileMetricEnricher;
use metrics_data::{finalize_corpus, report};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;
    settings.validate()?;

    tracing::debug!("ck-metrics v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Output directory: {}", settings.output_dir.display());

    match &settings.command {
        Command::Aggregate(args) => run_aggregate(&settings, args)?,

        Command::Finalize { format } => {
            let table = finalize_corpus(&settings.output_dir).with_context(|| {
                format!("finalizing corpus in {}", settings.output_dir.display())
            })?;
            print_report(table.as_ref(), format)?;
        }

        Command::Report { format } => {
            let table = RepoTable::load(&settings.output_dir).with_context(|| {
                format!("loading repository table from {}", settings.output_dir.display())
            })?;
            print_report(table.as_ref(), format)?;
        }
    }

    Ok(())
}

fn run_aggregate(settings: &Settings, args: &AggregateArgs) -> Result<()> {
    let policy = if args.replace_existing {
        MergePolicy::ReplaceExisting
    } else {
        MergePolicy::Append
    };

    let aggregator = RepoAggregator::new(&settings.output_dir)
        .with_enricher(FileMetricEnricher::new(args.source_root.clone()))
        .with_policy(policy);

    let files = aggregator
        .aggregate_repository(&args.repository, &args.export_dir)
        .with_context(|| format!("aggregating repository {}", args.repository))?;

    if files.is_empty() {
        tracing::warn!("Nothing recorded for {}", args.repository);
    } else {
        tracing::info!("{}: {} files aggregated", args.repository, files.len());
    }

    Ok(())
}

fn print_report(table: Option<&RepoTable>, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", report::render_json(table)?),
        _ => print!("{}", report::render_text(table)),
    }
    Ok(())
}
