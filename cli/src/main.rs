use clap::Parser;
use lxcify_container::{
    CategoryStyle, Launchers, default_applications_dir, default_lxcpath, provision_from_config,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lxcify")]
#[command(about = "Install a GUI app into its own unprivileged LXC container")]
struct Cli {
    /// App config file
    #[arg(long)]
    config: PathBuf,

    /// Name of the container to create
    #[arg(long)]
    name: String,

    /// Directory holding the containers [default: <data dir>/lxc]
    #[arg(long)]
    lxcpath: Option<PathBuf>,

    /// Where the desktop entry is written [default: <data dir>/applications]
    #[arg(long)]
    applications_dir: Option<PathBuf>,

    /// Write desktop entry categories without separators
    #[arg(long)]
    legacy_categories: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let lxcpath = cli.lxcpath.unwrap_or_else(default_lxcpath);
    let mut launchers = Launchers::new(
        cli.applications_dir
            .unwrap_or_else(default_applications_dir),
    );
    if cli.legacy_categories {
        launchers = launchers.with_category_style(CategoryStyle::Concatenated);
    }

    match provision_from_config(&cli.config, &cli.name, &lxcpath, &launchers).await {
        Ok(()) => {
            tracing::info!(container = %cli.name, "Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(container = %cli.name, error = %e, "Provisioning failed");
            ExitCode::FAILURE
        }
    }
}
