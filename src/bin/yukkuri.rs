use std::process::ExitCode;

use clap::Parser;
use yukkuri::{Cli, EXIT_OTHER, Pipeline, logging};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Keep clap's usage code (2) free for a missing input image.
        Err(e) if e.use_stderr() => {
            e.print().ok();
            return ExitCode::from(EXIT_OTHER);
        }
        Err(e) => e.exit(),
    };

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("failed to install logger: {e}");
    }

    let pipeline = Pipeline::new(cli.into_run_config());
    match pipeline.run() {
        Ok(report) => {
            if let Some(wav) = &report.kept_audio {
                tracing::info!(path = %wav.display(), "synthesized audio kept");
            }
            ExitCode::SUCCESS
        }
        // Already logged by the pipeline with its stage.
        Err(failure) => ExitCode::from(failure.exit_code()),
    }
}
