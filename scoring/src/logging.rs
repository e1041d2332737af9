use crate::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(thiserror::Error, Debug)]
pub enum LoggingError {
    #[error("could not open log file: {0}")]
    File(#[from] std::io::Error),
    #[error("invalid sentry dsn: {0}")]
    SentryDsn(#[from] sentry::types::ParseDsnError),
}

/// Installs the global subscriber. The returned guard flushes Sentry events
/// on drop and must be held for the lifetime of the process.
pub fn init(config: &LoggingConfig) -> Result<Option<sentry::ClientInitGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    let stdout_layer = file_layer.is_none().then(|| fmt::layer());

    let sentry_guard = match &config.sentry_dsn {
        Some(dsn) => Some(sentry::init(sentry::ClientOptions {
            dsn: Some(dsn.parse()?),
            release: sentry::release_name!(),
            ..Default::default()
        })),
        None => None,
    };
    let sentry_layer = sentry_guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .with(sentry_layer)
        .init();

    Ok(sentry_guard)
}
