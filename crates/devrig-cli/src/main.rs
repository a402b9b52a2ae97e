//! devrig CLI entry point.

use clap::Parser;
use devrig_cli::{init_logging, load_config, run, Cli};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let ctx = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &ctx.config.logging);

    let status = run(cli, ctx).await?;
    Ok(ExitCode::from(u8::try_from(status).unwrap_or(1)))
}
