use std::{ffi::OsString, fmt, path::PathBuf, time::Duration};

use tracing::Dispatch;

use crate::{
    audio::{SynthesizedAudio, probe_duration},
    config::RunConfig,
    encode::{
        command::build_command,
        ffmpeg::{ensure_parent_dir, locate_encoder_in, run_encoder},
    },
    foundation::error::YukkuriError,
    synthesis::{
        client::SynthesisClient,
        retry::{DEFAULT_REQUEST_TIMEOUT, RetryPolicy},
    },
};

/// Position of a run in its linear sequence of stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    ParsingArgs,
    ValidatingInputs,
    LocatingEncoder,
    SynthesizingAudio,
    ProbingDuration,
    BuildingCommand,
    Encoding,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::ParsingArgs => "parsing_args",
            Stage::ValidatingInputs => "validating_inputs",
            Stage::LocatingEncoder => "locating_encoder",
            Stage::SynthesizingAudio => "synthesizing_audio",
            Stage::ProbingDuration => "probing_duration",
            Stage::BuildingCommand => "building_command",
            Stage::Encoding => "encoding",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run that stopped early, with the stage it stopped in.
#[derive(thiserror::Error, Debug)]
#[error("{stage}: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub error: YukkuriError,
}

impl PipelineFailure {
    pub fn exit_code(&self) -> u8 {
        self.error.exit_code()
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub output_path: PathBuf,
    pub encoder_path: PathBuf,
    /// `None` when the synthesized audio could not be probed.
    pub audio_duration_secs: Option<f64>,
    /// Location of the WAV when it was kept with `keep_audio`.
    pub kept_audio: Option<PathBuf>,
}

/// Text → speech → MP4, run once per [`RunConfig`].
pub struct Pipeline {
    config: RunConfig,
    search_path: Option<OsString>,
    retry: RetryPolicy,
    timeout: Duration,
    temp_dir: Option<PathBuf>,
    dispatch: Option<Dispatch>,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            search_path: None,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            temp_dir: None,
            dispatch: None,
        }
    }

    /// Look the encoder up in `search_path` instead of `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Write the synthesized WAV into `dir` rather than the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Route this pipeline's events to `dispatch` instead of the global subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn run(&self) -> Result<RunReport, PipelineFailure> {
        match &self.dispatch {
            Some(d) => tracing::dispatcher::with_default(d, || self.execute()),
            None => self.execute(),
        }
    }

    fn execute(&self) -> Result<RunReport, PipelineFailure> {
        let cfg = &self.config;
        let span = tracing::info_span!("run", topic = %cfg.topic, speaker = cfg.speaker_id);
        let _guard = span.enter();

        enter(Stage::ValidatingInputs);
        cfg.validate().map_err(fail(Stage::ValidatingInputs))?;

        enter(Stage::LocatingEncoder);
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));
        let encoder =
            locate_encoder_in(&cfg.encoder, search_path).map_err(fail(Stage::LocatingEncoder))?;

        enter(Stage::SynthesizingAudio);
        let audio = self.synthesize().map_err(fail(Stage::SynthesizingAudio))?;

        enter(Stage::ProbingDuration);
        let audio_duration_secs = match probe_duration(audio.path()) {
            Ok(secs) => {
                tracing::info!(duration_secs = secs, "Audio duration: {secs:.2} seconds");
                Some(secs)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to get audio duration; continuing anyway");
                None
            }
        };

        enter(Stage::BuildingCommand);
        ensure_parent_dir(&cfg.output_path).map_err(fail(Stage::BuildingCommand))?;
        let command = build_command(
            &encoder,
            &cfg.background_path,
            audio.path(),
            &cfg.output_path,
            cfg.overlay_path.as_deref(),
        );

        enter(Stage::Encoding);
        let encoded = run_encoder(&command);
        let out = cfg.output_path.display();
        tracing::info!(path = %out, "Generated video: {out}");
        encoded.map_err(fail(Stage::Encoding))?;

        enter(Stage::Done);
        Ok(RunReport {
            output_path: cfg.output_path.clone(),
            encoder_path: encoder,
            audio_duration_secs,
            kept_audio: audio.is_kept().then(|| audio.path().to_path_buf()),
        })
    }

    fn synthesize(&self) -> Result<SynthesizedAudio, YukkuriError> {
        let cfg = &self.config;
        let client =
            SynthesisClient::with_policy(cfg.service_base_url(), self.retry.clone(), self.timeout);

        let query = client.audio_query(&cfg.topic, cfg.speaker_id)?;
        let wav = client.synthesize(&query, cfg.speaker_id)?;

        let audio = match &self.temp_dir {
            Some(dir) => SynthesizedAudio::write_in(dir, &wav)?,
            None => SynthesizedAudio::write(&wav)?,
        };
        if cfg.keep_audio {
            audio.persist()
        } else {
            Ok(audio)
        }
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = %stage, "entering stage");
}

fn fail(stage: Stage) -> impl FnOnce(YukkuriError) -> PipelineFailure {
    move |error| {
        match stage {
            Stage::SynthesizingAudio => {
                tracing::error!(stage = %stage, error = %error, "Failed to synthesize audio")
            }
            _ => tracing::error!(stage = %stage, error = %error, "run failed"),
        }
        PipelineFailure { stage, error }
    }
}
