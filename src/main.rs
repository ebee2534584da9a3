mod args;
mod commands;
mod shared;

use anyhow::Result;
use clap::Parser;

use args::InstallArgs;
use commands::run_install;

// Top-level entrypoint: parse CLI args and run the interactive install flow.
fn main() -> Result<()> {
    let args = InstallArgs::parse();
    run_install(args)
}
