use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ddr_common::{DocumentExtraction, DocumentKind, FusionConfig};
use ddr_fusion::collaborators::extraction::parse_extraction_response;
use ddr_fusion::collaborators::root_cause::{build_root_cause_summary, parse_root_cause_response};
use ddr_fusion::{report_context, FusionPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// The fused report as JSON
    Json,
    /// The prompt text blocks for report generation
    Context,
    /// The indexed observation summary the root-cause collaborator answers against
    RootCauseSummary,
}

#[derive(Parser)]
#[command(
    name = "ddr-fusion",
    about = "Fuse inspection and thermal extraction results into a scored diagnostic bundle"
)]
struct Cli {
    /// Extraction response for the inspection report
    #[arg(long)]
    inspection: Option<PathBuf>,

    /// Extraction response for the thermal report
    #[arg(long)]
    thermal: Option<PathBuf>,

    /// Root-cause collaborator response to join onto the observations
    #[arg(long)]
    root_causes: Option<PathBuf>,

    /// Path to config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Anomaly threshold in °C (overrides config and environment)
    #[arg(long)]
    anomaly_threshold: Option<f64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("ddr=info"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// File contents, or `None` when the text is blank.
fn read_optional(path: &Path) -> Result<Option<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(text).filter(|t| !t.trim().is_empty()))
}

fn load_document(path: Option<&Path>, kind: DocumentKind) -> Result<Option<DocumentExtraction>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let extraction = read_optional(path)?.map(|text| parse_extraction_response(&text, kind));
    if extraction.is_none() {
        info!(document = %kind, path = %path.display(), "Document is blank, skipping");
    }
    Ok(extraction)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let mut config = FusionConfig::load(cli.config.as_deref())?;
    if let Some(threshold) = cli.anomaly_threshold {
        config = config.with_anomaly_threshold(threshold)?;
    }
    config.log_summary();

    let inspection = load_document(cli.inspection.as_deref(), DocumentKind::Inspection)?;
    let thermal = load_document(cli.thermal.as_deref(), DocumentKind::Thermal)?;
    let root_causes = match cli.root_causes.as_deref() {
        Some(path) => read_optional(path)?.map(|text| parse_root_cause_response(&text)),
        None => None,
    };

    let pipeline = FusionPipeline::new(config);
    let report = pipeline.run(inspection.as_ref(), thermal.as_ref(), root_causes.as_deref())?;

    let rendered = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Context => {
            let ctx = report_context::render(&report);
            format!(
                "## Merged data\n{}\n\n## Conflicts\n{}\n\n## Missing\n{}",
                ctx.merged_data, ctx.conflicts, ctx.missing
            )
        }
        OutputFormat::RootCauseSummary => {
            build_root_cause_summary(&report.observations, Some(&report.temperature_analysis))
        }
    };

    match cli.output {
        Some(path) => {
            fs::write(&path, format!("{rendered}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
