use std::path::PathBuf;

use clap::{Args, ValueEnum};
use creditlens_analysis::report::ReportComposer;

use super::profile::{self, PopulationArg};
use crate::util::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReportFormat {
    /// Plain-text report
    Text,
    /// Structured report document
    Json,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct ReportArg {
    #[clap(flatten)]
    pub profile: PopulationArg,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Output file path (defaults to stdout)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ReportArg) -> anyhow::Result<()> {
    let (model, profile) = profile::compute_profile(&arg.profile)?;
    let document = ReportComposer::default().compose(model.metadata(), &profile);
    match arg.format {
        ReportFormat::Text => Output::save_text(&document, arg.output.clone())?,
        ReportFormat::Json => Output::save_json(&document, arg.output.clone())?,
    }
    Ok(())
}
