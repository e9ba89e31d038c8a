use creditlens_analysis::profile::ProfilerConfig;
use creditlens_explainer::explainer::ExplainerConfig;
use serde::{Deserialize, Serialize};

/// Contents of the `--config` file; every section and field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub explainer: ExplainerConfig,
    pub profiler: ProfilerConfig,
}
