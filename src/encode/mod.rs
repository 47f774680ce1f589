//! MP4 composition through the system `ffmpeg`.
//!
//! The argument vector is built purely in [`command`]; [`ffmpeg`] locates and runs the binary.

/// Pure construction of the encoder argument vector.
pub mod command;
/// Encoder discovery and invocation.
pub mod ffmpeg;
