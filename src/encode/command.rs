use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

/// Distance in pixels between the overlay and the bottom/right frame edges.
pub const OVERLAY_MARGIN_PX: u32 = 10;
/// Output pixel format (h264 + yuv420p for broad player compatibility).
pub const PIXEL_FORMAT: &str = "yuv420p";
pub const VIDEO_CODEC: &str = "libx264";
pub const AUDIO_CODEC: &str = "aac";
pub const AUDIO_BITRATE: &str = "192k";

/// A fully resolved encoder invocation: program plus argument vector.
///
/// Never passed through a shell; each argument reaches the process unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl EncodeCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for EncodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Filter graph placing input 1 over input 0 at the bottom-right corner.
pub fn overlay_filter() -> String {
    format!(
        "[0:v][1:v] overlay=W-w-{m}:H-h-{m},format={PIXEL_FORMAT}",
        m = OVERLAY_MARGIN_PX
    )
}

/// Build the `ffmpeg` invocation that loops `background` for the length of `audio`.
///
/// With `overlay`, the image is added as the second input and composited by
/// [`overlay_filter`]. Output is always overwritten and cut to the shortest stream.
pub fn build_command(
    encoder: &Path,
    background: &Path,
    audio: &Path,
    output: &Path,
    overlay: Option<&Path>,
) -> EncodeCommand {
    let mut args: Vec<OsString> = Vec::with_capacity(24);
    let mut push = |a: &dyn AsRef<OsStr>| args.push(a.as_ref().to_os_string());

    push(&"-y");
    push(&"-loop");
    push(&"1");
    push(&"-i");
    push(&background);
    if let Some(overlay) = overlay {
        push(&"-i");
        push(&overlay);
    }
    push(&"-i");
    push(&audio);

    if overlay.is_some() {
        push(&"-filter_complex");
        push(&overlay_filter());
    } else {
        push(&"-vf");
        push(&format!("format={PIXEL_FORMAT}"));
    }

    for a in [
        "-c:v",
        VIDEO_CODEC,
        "-c:a",
        AUDIO_CODEC,
        "-b:a",
        AUDIO_BITRATE,
        "-shortest",
    ] {
        push(&a);
    }
    push(&output);

    EncodeCommand::new(encoder, args)
}
