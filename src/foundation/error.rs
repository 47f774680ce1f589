use std::{fmt, path::PathBuf};

/// Exit code reported when a background or overlay image does not exist.
pub const EXIT_INPUT_NOT_FOUND: u8 = 2;
/// Exit code reported when the encoder executable cannot be found on `PATH`.
pub const EXIT_ENCODER_NOT_FOUND: u8 = 3;
/// Exit code reported when the speech service could not produce audio.
pub const EXIT_SYNTHESIS_FAILED: u8 = 4;
/// Exit code for every other failure.
pub const EXIT_OTHER: u8 = 1;

pub type YukkuriResult<T> = Result<T, YukkuriError>;

/// Which user-supplied image a path refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputRole {
    Background,
    Overlay,
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Background => f.write_str("background image"),
            Self::Overlay => f.write_str("char image"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum YukkuriError {
    #[error("{role} not found: {}", path.display())]
    InputNotFound { role: InputRole, path: PathBuf },

    #[error("encoder not found: '{program}' is not on PATH")]
    EncoderNotFound { program: String },

    #[error("synthesis error: {url}: {message}")]
    Synthesis {
        url: String,
        /// HTTP status of the last attempt, `None` for transport failures.
        status: Option<u16>,
        message: String,
    },

    #[error("audio format error: {0}")]
    AudioFormat(String),

    #[error("encoder execution error ({status}): {stderr}")]
    EncoderExecution { status: String, stderr: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl YukkuriError {
    pub fn input_not_found(role: InputRole, path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound {
            role,
            path: path.into(),
        }
    }

    pub fn encoder_not_found(program: impl Into<String>) -> Self {
        Self::EncoderNotFound {
            program: program.into(),
        }
    }

    pub fn synthesis(url: impl Into<String>, status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Synthesis {
            url: url.into(),
            status,
            message: msg.into(),
        }
    }

    pub fn audio_format(msg: impl Into<String>) -> Self {
        Self::AudioFormat(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Process exit code the CLI reports for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InputNotFound { .. } => EXIT_INPUT_NOT_FOUND,
            Self::EncoderNotFound { .. } => EXIT_ENCODER_NOT_FOUND,
            Self::Synthesis { .. } => EXIT_SYNTHESIS_FAILED,
            Self::AudioFormat(_)
            | Self::EncoderExecution { .. }
            | Self::Validation(_)
            | Self::Other(_) => EXIT_OTHER,
        }
    }
}
