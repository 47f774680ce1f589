//! Yukkuri turns a line of text into a narrated still-image MP4.
//!
//! A run asks a VOICEVOX-compatible speech service for audio, then has the system `ffmpeg`
//! loop a background image (optionally with a character overlay) for the length of that audio:
//!
//! - Parse a [`RunConfig`] (see [`Cli`])
//! - Build a [`Pipeline`] and call [`Pipeline::run`]
//! - Map a [`PipelineFailure`] to a process exit code with [`PipelineFailure::exit_code`]
#![forbid(unsafe_code)]

mod foundation;

pub mod audio;
pub mod config;
pub mod encode;
pub mod logging;
pub mod pipeline;
pub mod synthesis;

pub use crate::foundation::error::{
    EXIT_ENCODER_NOT_FOUND, EXIT_INPUT_NOT_FOUND, EXIT_OTHER, EXIT_SYNTHESIS_FAILED, InputRole,
    YukkuriError, YukkuriResult,
};

pub use crate::audio::{SynthesizedAudio, probe_duration};
pub use crate::config::{Cli, RunConfig};
pub use crate::encode::command::{EncodeCommand, build_command};
pub use crate::encode::ffmpeg::{EncoderOutput, locate_encoder_in, run_encoder};
pub use crate::pipeline::{Pipeline, PipelineFailure, RunReport, Stage};
pub use crate::synthesis::client::{AudioQuery, SynthesisClient};
pub use crate::synthesis::retry::{AttemptFailure, RetryPolicy};
