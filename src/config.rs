use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use crate::foundation::error::{InputRole, YukkuriError, YukkuriResult};

pub const DEFAULT_VOICEVOX_HOST: &str = "127.0.0.1";
pub const DEFAULT_VOICEVOX_PORT: u16 = 50021;
pub const DEFAULT_VOICE_ID: u32 = 1;
pub const DEFAULT_OUT_PATH: &str = "out/result.mp4";
pub const DEFAULT_ENCODER: &str = "ffmpeg";

/// Generate a yukkuri-style narrated video using VOICEVOX.
#[derive(Parser, Debug, Clone)]
#[command(name = "yukkuri", version)]
pub struct Cli {
    /// Topic text to narrate.
    pub topic: String,

    /// VOICEVOX speaker id.
    #[arg(long, env = "VOICE_ID", default_value_t = DEFAULT_VOICE_ID)]
    pub voice_id: u32,

    /// VOICEVOX host.
    #[arg(long, env = "VOICEVOX_HOST", default_value = DEFAULT_VOICEVOX_HOST)]
    pub voicevox_host: String,

    /// VOICEVOX port.
    #[arg(long, env = "VOICEVOX_PORT", default_value_t = DEFAULT_VOICEVOX_PORT)]
    pub voicevox_port: u16,

    /// Background image path (e.g. assets/background.png).
    #[arg(long)]
    pub background: PathBuf,

    /// Character image composited at the bottom-right corner.
    #[arg(long = "char")]
    pub char_path: Option<PathBuf>,

    /// Output MP4 path.
    #[arg(long, default_value = DEFAULT_OUT_PATH)]
    pub out: PathBuf,

    /// Encoder program name or path, resolved against PATH.
    #[arg(long, env = "FFMPEG", default_value = DEFAULT_ENCODER)]
    pub ffmpeg: String,

    /// Keep the synthesized WAV instead of deleting it after the run.
    #[arg(long)]
    pub keep_audio: bool,

    /// Raise log verbosity (-v: debug, -vv: trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn into_run_config(self) -> RunConfig {
        RunConfig {
            topic: self.topic,
            speaker_id: self.voice_id,
            service_host: self.voicevox_host,
            service_port: self.voicevox_port,
            background_path: self.background,
            overlay_path: self.char_path,
            output_path: self.out,
            encoder: self.ffmpeg,
            keep_audio: self.keep_audio,
        }
    }
}

/// Everything a single run needs, fixed once parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub topic: String,
    pub speaker_id: u32,
    pub service_host: String,
    pub service_port: u16,
    pub background_path: PathBuf,
    pub overlay_path: Option<PathBuf>,
    pub output_path: PathBuf,
    pub encoder: String,
    pub keep_audio: bool,
}

impl RunConfig {
    /// Config with built-in defaults for everything but the topic and background.
    pub fn new(topic: impl Into<String>, background_path: impl Into<PathBuf>) -> Self {
        Self {
            topic: topic.into(),
            speaker_id: DEFAULT_VOICE_ID,
            service_host: DEFAULT_VOICEVOX_HOST.to_string(),
            service_port: DEFAULT_VOICEVOX_PORT,
            background_path: background_path.into(),
            overlay_path: None,
            output_path: PathBuf::from(DEFAULT_OUT_PATH),
            encoder: DEFAULT_ENCODER.to_string(),
            keep_audio: false,
        }
    }

    pub fn with_overlay(mut self, overlay_path: impl Into<PathBuf>) -> Self {
        self.overlay_path = Some(overlay_path.into());
        self
    }

    pub fn with_output(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }

    pub fn with_service(mut self, host: impl Into<String>, port: u16) -> Self {
        self.service_host = host.into();
        self.service_port = port;
        self
    }

    pub fn with_speaker(mut self, speaker_id: u32) -> Self {
        self.speaker_id = speaker_id;
        self
    }

    pub fn with_encoder(mut self, encoder: impl Into<String>) -> Self {
        self.encoder = encoder.into();
        self
    }

    pub fn with_keep_audio(mut self, keep_audio: bool) -> Self {
        self.keep_audio = keep_audio;
        self
    }

    /// Base URL of the speech service, without a trailing slash.
    pub fn service_base_url(&self) -> String {
        format!("http://{}:{}", self.service_host, self.service_port)
    }

    /// Check that the background and (if given) overlay images exist.
    pub fn validate(&self) -> YukkuriResult<()> {
        require_file(InputRole::Background, &self.background_path)?;
        if let Some(overlay) = &self.overlay_path {
            require_file(InputRole::Overlay, overlay)?;
        }
        Ok(())
    }
}

fn require_file(role: InputRole, path: &Path) -> YukkuriResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(YukkuriError::input_not_found(role, path))
    }
}
