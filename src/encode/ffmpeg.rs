use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::Context as _;

use super::command::EncodeCommand;
use crate::foundation::error::{YukkuriError, YukkuriResult};

/// Captured output of a successful encoder run.
#[derive(Clone, Debug, Default)]
pub struct EncoderOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Resolve `program` against an explicit search path (same syntax as `PATH`).
pub fn locate_encoder_in(program: &str, search_path: Option<OsString>) -> YukkuriResult<PathBuf> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    match which::which_in(program, search_path, cwd) {
        Ok(path) => {
            tracing::debug!(program, path = %path.display(), "located encoder");
            Ok(path)
        }
        Err(e) => {
            tracing::error!(
                program,
                reason = %e,
                "{program} not found in PATH. Please install ffmpeg and ensure it's on PATH."
            );
            Err(YukkuriError::encoder_not_found(program))
        }
    }
}

/// Run the encoder to completion, capturing stdout and stderr.
///
/// Blocks until the process exits; there is no timeout.
#[tracing::instrument(skip_all, fields(program = %command.program().display()))]
pub fn run_encoder(command: &EncodeCommand) -> YukkuriResult<EncoderOutput> {
    tracing::info!("running ffmpeg");
    tracing::debug!(command = %command, "ffmpeg command");

    let output = command
        .to_command()
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                YukkuriError::encoder_not_found(command.program().display().to_string())
            } else {
                anyhow::Error::new(e)
                    .context(format!(
                        "failed to spawn '{}'",
                        command.program().display()
                    ))
                    .into()
            }
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        tracing::error!(status = %output.status, stderr = %stderr, "ffmpeg failed");
        return Err(YukkuriError::EncoderExecution {
            status: output.status.to_string(),
            stderr,
        });
    }

    tracing::info!("ffmpeg completed successfully");
    Ok(EncoderOutput { stdout, stderr })
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> YukkuriResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
