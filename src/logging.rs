//! Subscriber construction.
//!
//! Library code only emits `tracing` events. A subscriber is built here and either installed
//! process-wide by the binary ([`init`]) or handed to a [`crate::Pipeline`] as a scoped
//! [`Dispatch`].

use tracing::Dispatch;
use tracing_subscriber::{EnvFilter, fmt::MakeWriter};

use crate::foundation::error::YukkuriResult;

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "info,yukkuri=debug",
        _ => "debug,yukkuri=trace",
    }
}

/// `RUST_LOG` if set and valid, otherwise [`default_directive`].
pub fn env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
}

/// Build a formatted, filtered subscriber writing to `make_writer`.
pub fn dispatch<W>(filter: EnvFilter, make_writer: W, ansi: bool) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_ansi(ansi)
        .with_target(false)
        .finish();
    Dispatch::new(subscriber)
}

/// Install the stderr subscriber as the global default.
pub fn init(verbosity: u8) -> YukkuriResult<()> {
    let dispatch = dispatch(env_filter(verbosity), std::io::stderr, true);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::new)?;
    Ok(())
}
