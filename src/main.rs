//! dbgctl - Headless debugger session controller
//!
//! This is the binary entry point. All logic lives in the library crates.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;

use dbgctl_app::config::{init_config_dir, load_settings, load_settings_from};
use dbgctl_app::StaticProjectPaths;

/// dbgctl - Start, observe and stop debugger sessions from the command line
#[derive(Parser, Debug)]
#[command(name = "dbgctl")]
#[command(about = "Headless debugger session controller", long_about = None)]
struct Args {
    /// Project directory (defaults to the current directory)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Settings file to use instead of <PATH>/.dbgctl/config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Open project path used for connections (repeatable, overrides config)
    #[arg(long = "project-path", value_name = "PATH")]
    project_paths: Vec<String>,

    /// Write a default .dbgctl/config.toml and exit
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    dbgctl_core::logging::init()?;

    let project_path = args
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if args.init {
        init_config_dir(&project_path)?;
        eprintln!(
            "Wrote default settings to {}",
            dbgctl_app::config::config_path(&project_path).display()
        );
        eprintln!(
            "Logs are written to {}",
            dbgctl_core::logging::log_directory().display()
        );
        return Ok(());
    }

    let mut settings = match &args.config {
        Some(path) => load_settings_from(path),
        None => load_settings(&project_path),
    };
    if settings.adapter.cwd.is_none() {
        settings.adapter.cwd = Some(project_path.clone());
    }

    let paths = if args.project_paths.is_empty() {
        settings.connections.project_paths.clone()
    } else {
        args.project_paths
    };

    dbgctl::run_headless(settings, Arc::new(StaticProjectPaths::new(paths))).await?;
    Ok(())
}
