use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use tempfile::NamedTempFile;

use crate::foundation::error::{YukkuriError, YukkuriResult};

const TEMP_PREFIX: &str = "yukkuri";
const TEMP_SUFFIX: &str = ".wav";

/// WAV bytes returned by the speech service, stored on disk for the encoder.
///
/// The temporary file is removed when this value is dropped unless [`SynthesizedAudio::persist`]
/// was called.
#[derive(Debug)]
pub struct SynthesizedAudio {
    backing: Backing,
}

#[derive(Debug)]
enum Backing {
    Temp(NamedTempFile),
    Kept(PathBuf),
}

impl SynthesizedAudio {
    /// Write `bytes` to a fresh `yukkuri*.wav` file in the system temp directory.
    pub fn write(bytes: &[u8]) -> YukkuriResult<Self> {
        Self::write_in(std::env::temp_dir(), bytes)
    }

    pub fn write_in(dir: impl AsRef<Path>, bytes: &[u8]) -> YukkuriResult<Self> {
        if bytes.is_empty() {
            return Err(YukkuriError::validation("refusing to write an empty audio file"));
        }

        let dir = dir.as_ref();
        let mut file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)
            .with_context(|| format!("failed to create temp wav in '{}'", dir.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("failed to write '{}'", file.path().display()))?;
        file.flush()
            .with_context(|| format!("failed to flush '{}'", file.path().display()))?;

        tracing::info!(path = %file.path().display(), bytes = bytes.len(), "saved synthesized wav");
        Ok(Self {
            backing: Backing::Temp(file),
        })
    }

    pub fn path(&self) -> &Path {
        match &self.backing {
            Backing::Temp(f) => f.path(),
            Backing::Kept(p) => p,
        }
    }

    pub fn is_kept(&self) -> bool {
        matches!(self.backing, Backing::Kept(_))
    }

    /// Keep the file on disk after this value is dropped.
    pub fn persist(self) -> YukkuriResult<Self> {
        let path = match self.backing {
            Backing::Kept(path) => path,
            Backing::Temp(file) => {
                let (_, path) = file
                    .keep()
                    .map_err(|e| anyhow::Error::new(e.error).context("failed to keep temp wav"))?;
                tracing::info!(path = %path.display(), "keeping synthesized wav");
                path
            }
        };
        Ok(Self {
            backing: Backing::Kept(path),
        })
    }
}

/// Duration in seconds of the WAV file at `path`: frame count over sample rate.
pub fn probe_duration(path: &Path) -> YukkuriResult<f64> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| YukkuriError::audio_format(format!("{}: {e}", path.display())))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(YukkuriError::audio_format(format!(
            "{}: sample rate is zero",
            path.display()
        )));
    }
    Ok(f64::from(reader.duration()) / f64::from(spec.sample_rate))
}
