use clap::Parser;
use std::path::PathBuf;

// CLI root definition. Single-purpose binary: confirm, install, confirm exit.
// Paths and install policy are configurable but default to the repro setup.
#[derive(Parser, Debug, Clone)]
#[command(name = "chart-repro-installer", version)]
#[command(about = "Interactive chart installer with Ctrl-C cancellation of the in-flight install")]
pub struct InstallArgs {
    #[arg(long, default_value = "repro")]
    pub namespace: String,
    #[arg(long, default_value = "chart")]
    pub chart_dir: PathBuf,
    #[arg(long, default_value = "repro")]
    pub release_name: String,
    #[arg(long, default_value_t = 30)]
    pub timeout_mins: u64,
    #[arg(long, default_value = "helm")]
    pub helm_path: PathBuf,
    #[arg(long, env = "HELM_DRIVER")]
    pub storage_driver: Option<String>,
}
