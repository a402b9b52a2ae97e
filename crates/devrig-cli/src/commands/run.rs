//! Supervised command execution.

use clap::Args;
use console::style;
use devrig_process::{CancellationToken, Output, ProcessOptions, ProcessOutcome, Stdin};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::AppContext;

/// Run command arguments.
#[derive(Args)]
pub struct RunArgs {
    /// Cancel the command after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Milliseconds between the termination request and a forced kill
    #[arg(long)]
    pub kill_grace_ms: Option<u64>,

    /// Capture output and print it when the command finishes
    #[arg(long)]
    pub capture: bool,

    /// Command to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

fn options(args: &RunArgs, ctx: &AppContext) -> ProcessOptions {
    let mut options = ProcessOptions::from_config(&ctx.config.process);
    if let Some(secs) = args.timeout {
        options.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if let Some(ms) = args.kill_grace_ms {
        options.kill_grace = Duration::from_millis(ms);
    }

    if args.capture {
        options
            .with_stdin(Stdin::Inherit)
            .with_stdout(Output::Capture)
            .with_stderr(Output::Capture)
    } else {
        options.inherit_stdio()
    }
}

/// Run the command. Returns the status the shell should see.
pub async fn run(args: RunArgs, ctx: &AppContext) -> anyhow::Result<i32> {
    let Some((program, rest)) = args.command.split_first() else {
        anyhow::bail!("No command given");
    };

    let token = CancellationToken::new();
    let options = options(&args, ctx).with_cancel(token.clone());

    let supervised = devrig_process::run(program, rest, options);
    tokio::pin!(supervised);

    let result = tokio::select! {
        result = &mut supervised => result,
        _ = tokio::signal::ctrl_c() => {
            debug!(program = %program, "interrupt received, cancelling");
            token.cancel();
            supervised.await
        }
    };

    if args.capture {
        if let Some(out) = &result.stdout {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(out).await?;
            stdout.flush().await?;
        }
        if let Some(err) = &result.stderr {
            let mut stderr = tokio::io::stderr();
            stderr.write_all(err).await?;
            stderr.flush().await?;
        }
        if result.stdout_truncated || result.stderr_truncated {
            eprintln!(
                "{} output truncated at {} bytes per stream",
                style("!").yellow(),
                ctx.config.process.max_output_bytes
            );
        }
    }

    // A plain exit speaks for itself through the status.
    if !matches!(result.outcome, ProcessOutcome::Exited { .. }) {
        eprintln!("{} {}: {}", style("✗").red(), program, result.outcome);
    }

    Ok(result.outcome.shell_status())
}
