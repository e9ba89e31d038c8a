use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use creditlens_explainer::{
    explainer::{PerPredictionExplainer, SessionExplanation},
    service::ModelService,
};
use rand::SeedableRng as _;
use rand_pcg::Pcg64;

use crate::util::{self, Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct ExplainArg {
    /// Path to the model bundle JSON file
    #[arg(long)]
    pub bundle: PathBuf,

    /// Path to the applicant JSON file
    #[arg(long)]
    pub applicant: PathBuf,

    /// Path to the configuration JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of features listed as top features
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Seed of the explanation layer draw (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Session the explanation belongs to
    #[arg(long)]
    pub session_id: Option<String>,

    /// Earlier explanation of the same session; its layer is reused
    #[arg(long, requires = "session_id")]
    pub previous: Option<PathBuf>,

    /// Output file path (defaults to stdout)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ExplainArg) -> anyhow::Result<()> {
    let mut config = util::read_config_file(arg.config.as_deref())?.explainer;
    if let Some(top_n) = arg.top_n {
        config.top_n = top_n;
    }
    let explainer = PerPredictionExplainer::new(config);

    let bundle = util::read_bundle_file(&arg.bundle)?;
    let raw = util::read_applicant_file(&arg.applicant)?;

    let service = ModelService::new();
    service
        .load(|| bundle.into_loaded_model())
        .with_context(|| format!("Failed to load model bundle: {}", arg.bundle.display()))?;
    let model = service.snapshot()?;

    let mut rng = match arg.seed {
        Some(seed) => Pcg64::seed_from_u64(seed),
        None => Pcg64::from_rng(&mut rand::rng()),
    };

    let Some(session_id) = &arg.session_id else {
        let explanation = explainer
            .explain_raw(&model, &raw, &mut rng)
            .context("Failed to explain the applicant")?;
        tracing::info!(
            layer = %explanation.assigned_layer,
            predicted = explanation.predicted_value,
            "explained applicant"
        );
        return Output::save_json(&explanation, arg.output.clone());
    };

    let previous = arg
        .previous
        .as_ref()
        .map(|path| util::read_json_file::<SessionExplanation, _>("session explanation", path))
        .transpose()?;
    if let Some(previous) = &previous {
        anyhow::ensure!(
            previous.session_id == *session_id,
            "Previous explanation belongs to session {}, not {session_id}",
            previous.session_id
        );
    }

    let record = model
        .catalog()
        .engineer(&raw)
        .context("Failed to explain the applicant")?;
    let session = explainer
        .explain_session(&service, session_id, previous.as_ref(), &record, &mut rng)
        .context("Failed to explain the applicant")?;
    tracing::info!(
        session_id = %session.session_id,
        layer = %session.layer(),
        predicted = session.explanation.predicted_value,
        "explained applicant"
    );
    Output::save_json(&session, arg.output.clone())
}
