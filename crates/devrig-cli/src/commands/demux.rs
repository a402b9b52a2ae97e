//! Engine stream demultiplexing command.

use anyhow::Context;
use clap::Args;
use devrig_stream::{demux_copy, CopyStats, DemuxLimits};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::AppContext;

/// Demux command arguments.
#[derive(Args)]
pub struct DemuxArgs {
    /// Captured stream to read; stdin when omitted or `-`
    pub file: Option<PathBuf>,

    /// Total stream size in bytes; frames extending past it are rejected.
    /// Defaults to the file size when reading a file.
    #[arg(long)]
    pub expect_size: Option<u64>,

    /// Largest accepted frame payload in bytes
    #[arg(long)]
    pub max_frame: Option<u32>,
}

fn limits(args: &DemuxArgs, ctx: &AppContext, file_len: Option<u64>) -> DemuxLimits {
    DemuxLimits {
        expected_total: args.expect_size.or(file_len),
        max_frame_len: args.max_frame.or(ctx.config.stream.max_frame_bytes),
    }
}

/// Copy a multiplexed stream from `reader` to the given writers.
pub async fn demux_to<R, O, E>(
    reader: R,
    stdout: &mut O,
    stderr: &mut E,
    limits: DemuxLimits,
) -> anyhow::Result<CopyStats>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let stats = demux_copy(reader, stdout, stderr, limits)
        .await
        .context("Failed to demultiplex stream")?;
    debug!(
        frames = stats.frames,
        stdout_bytes = stats.stdout_bytes,
        stderr_bytes = stats.stderr_bytes,
        "stream demultiplexed"
    );
    Ok(stats)
}

/// Run the demux command.
pub async fn run(args: DemuxArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();

    match args.file.as_deref().filter(|p| *p != Path::new("-")) {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let len = file.metadata().await.ok().map(|m| m.len());
            demux_to(file, &mut stdout, &mut stderr, limits(&args, ctx, len)).await?;
        }
        None => {
            let limits = limits(&args, ctx, None);
            demux_to(tokio::io::stdin(), &mut stdout, &mut stderr, limits).await?;
        }
    }

    Ok(())
}
