pub mod bulk;
pub mod config;
pub mod export;
pub mod import;

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::{info, LevelFilter};
use simplelog::{Config, WriteLogger};

use crate::thingsboard::client::RestClient;
use crate::thingsboard::config::TbportConfig;
use crate::transfer::{ConsoleNotifier, ImportExportService};

pub type CliService = ImportExportService<RestClient, ConsoleNotifier>;

/// Which config file and server entry a command talks to.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    #[clap(short, long)]
    pub file: Option<String>,
    /// Server entry name; defaults to `active_server` or the only entry.
    #[clap(short, long)]
    pub server: Option<String>,
}

impl ServerArgs {
    pub fn service(&self) -> Result<CliService> {
        let path = self.file.as_ref().map(PathBuf::from);
        let config = TbportConfig::from_file(path.as_ref())?;
        let server = config.select_server(self.server.as_deref())?;
        info!("Using server '{}' at {}", server.name, server.endpoint);
        let client = RestClient::try_from(server)
            .with_context(|| format!("Failed to build client for '{}'", server.name))?;
        Ok(ImportExportService::new(client, ConsoleNotifier))
    }
}

pub fn init_logging() -> Result<()> {
    if let Ok(log_level) = std::env::var("TBPORT_LOG") {
        setup_logging(&log_level)?;
    }
    Ok(())
}

fn setup_logging(log_level: &str) -> Result<()> {
    let log_dir = crate::get_state_dir().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file_path = log_dir.join(format!(
        "tbport-debug-{}.log",
        chrono::Local::now().format("%Y%m%d%H%M%S")
    ));

    WriteLogger::init(
        parse_level(log_level),
        Config::default(),
        File::create(&log_file_path)?,
    )?;

    info!("Logging to: {}", log_file_path.display());
    Ok(())
}

fn parse_level(log_level: &str) -> LevelFilter {
    match log_level.to_lowercase().as_str() {
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("DEBUG", LevelFilter::Debug)]
    #[case("trace", LevelFilter::Trace)]
    #[case("warn", LevelFilter::Warn)]
    #[case("error", LevelFilter::Error)]
    #[case("verbose", LevelFilter::Info)]
    fn test_parse_level(#[case] input: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_level(input), expected);
    }
}
