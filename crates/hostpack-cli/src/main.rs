mod dispatch;
mod interaction;
mod logging;
mod render;
mod staging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use hostpack_core::VersionSelectMethod;
use hostpack_installer::StorageMode;

use crate::dispatch::run_cli;
use crate::render::{current_output_style, render_status_line};

#[derive(Parser, Debug)]
#[command(name = "hostpack")]
#[command(about = "Dependency-aware package manager for host projects", long_about = None)]
struct Cli {
    #[arg(long, global = true, env = "HOSTPACK_PROJECT", value_name = "DIR")]
    project: Option<PathBuf>,

    #[arg(long, global = true, env = "HOSTPACK_REGISTRY_ROOT", value_name = "DIR")]
    registry_root: Option<PathBuf>,

    #[arg(long, global = true, value_parser = parse_method)]
    method: Option<VersionSelectMethod>,

    #[arg(long, global = true)]
    allow_prerelease: bool,

    #[arg(short, long, global = true)]
    yes: bool,

    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    Install { spec: String },
    Change { id: String, version: String },
    Uninstall { id: String },
    /// Reinstall packages that fail the integrity check
    Repair { id: Option<String> },
    ReinstallAll,
    Cleanup,
    Convert {
        #[arg(value_parser = parse_storage_mode)]
        mode: StorageMode,
    },
    /// Finish an operation interrupted by a host restart
    Resume,
    List,
    Search { query: String },
    Info { id: String },
    /// Clear an operation marker left behind by a killed process
    Unlock,
}

fn parse_method(value: &str) -> Result<VersionSelectMethod, String> {
    value.parse().map_err(|err: anyhow::Error| err.to_string())
}

fn parse_storage_mode(value: &str) -> Result<StorageMode, String> {
    value.parse().map_err(|err: anyhow::Error| err.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    match run_cli(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!(
                "{}",
                render_status_line(current_output_style(), "err", &format!("{err:#}"))
            );
            ExitCode::from(1)
        }
    }
}
