use std::path::PathBuf;
use std::sync::LazyLock;

use clap::Parser;

mod commands;
mod thingsboard;
mod transfer;

use anyhow::Result;
use commands::bulk::BulkImportCommand;
use commands::config::model::ConfigCommand;
use commands::export::ExportCommand;
use commands::import::ImportCommand;
use dirs::{config_dir, home_dir, state_dir};

/// Configuration file path following the XDG Base Directory specification
/// (`~/.config/tbport/config.toml`).
static CONFIG_FILE: LazyLock<PathBuf> = LazyLock::new(|| {
    config_dir()
        .unwrap_or_else(|| {
            home_dir()
                .expect("HOME directory must be set to run tbport")
                .join(".config")
        })
        .join("tbport")
        .join("config.toml")
});

/// XDG state directory, used for logs.
pub fn get_state_dir() -> PathBuf {
    state_dir()
        .unwrap_or_else(|| {
            home_dir()
                .expect("HOME directory must be set to run tbport")
                .join(".local")
                .join("state")
        })
        .join("tbport")
}

#[derive(Parser)]
#[clap(name = "tbport", bin_name = "tbport", version, about)]
struct TbportApp {
    #[clap(subcommand)]
    command: TbportCommand,
}

#[derive(Parser)]
enum TbportCommand {
    /// Export one entity to a JSON (or ZIP) file.
    Export(ExportCommand),
    /// Validate a previously exported file and create the entity from it.
    Import(ImportCommand),
    /// Create devices, assets or edges from a CSV file.
    BulkImport(BulkImportCommand),
    #[clap(subcommand)]
    Config(ConfigCommand),
}

impl TbportApp {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            TbportCommand::Export(cmd) => cmd.run().await,
            TbportCommand::Import(cmd) => cmd.run().await,
            TbportCommand::BulkImport(cmd) => cmd.run().await,
            TbportCommand::Config(cmd) => cmd.run(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    commands::init_logging()?;

    let app = TbportApp::parse();
    app.run().await
}
