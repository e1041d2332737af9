mod config;
mod logging;

use clap::{Args, Parser};
use config::{Config, ConfigError, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "scoring", about = "Scoring API server")]
enum CliCommand {
    /// Start the HTTP service
    Run(ConfigArgs),
    /// Load and validate the config file, then exit
    Validate(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, short, default_value = "scoring.yaml")]
    config: PathBuf,
    /// Overrides the listener port from the config file
    #[arg(long, short)]
    port: Option<u16>,
    /// Overrides the log file from the config file
    #[arg(long, short)]
    log: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<Config, ConfigError> {
        let mut config = Config::from_file(&self.config)?;
        if let Some(port) = self.port {
            config.api.listener.port = port;
        }
        if let Some(log) = &self.log {
            config.common.logging.get_or_insert_default().file = Some(log.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] logging::LoggingError),
    #[error("could not build statsd exporter: {0}")]
    Statsd(#[from] metrics_exporter_statsd::StatsdError),
    #[error("a metrics recorder is already installed")]
    RecorderInstalled,
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Service(#[from] api::ServiceError),
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(&config.prefix))?;
    metrics::set_global_recorder(recorder).map_err(|_| CliError::RecorderInstalled)?;
    Ok(())
}

fn run(args: &ConfigArgs) -> Result<(), CliError> {
    let config = args.load()?;
    let _sentry = logging::init(&config.common.logging.clone().unwrap_or_default())?;

    if let Some(metrics) = &config.common.metrics {
        init_metrics(metrics)?;
    }

    tracing::info!(
        host = %config.api.listener.host,
        port = config.api.listener.port,
        "starting scoring api"
    );
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(api::run(config.api))?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let result = match &cli {
        CliCommand::Run(args) => run(args),
        CliCommand::Validate(args) => args.load().map(|_| println!("config ok")).map_err(CliError::from),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    fn args(config: &tempfile::NamedTempFile, port: Option<u16>) -> ConfigArgs {
        ConfigArgs {
            config: config.path().to_path_buf(),
            port,
            log: Some(PathBuf::from("/tmp/scoring.log")),
        }
    }

    #[test]
    fn overrides_apply_before_validation() {
        let tmp = write_tmp_file(
            r#"
            api:
                listener:
                    host: 0.0.0.0
                    port: 0
            "#,
        );

        let config = args(&tmp, Some(9000)).load().expect("port override fixes config");
        assert_eq!(config.api.listener.port, 9000);
        assert_eq!(
            config.common.logging.and_then(|logging| logging.file),
            Some(PathBuf::from("/tmp/scoring.log"))
        );

        assert!(matches!(
            args(&tmp, None).load(),
            Err(ConfigError::Validation(_))
        ));
    }
}
