use std::path::PathBuf;

use anyhow::Result;

use super::model::ListCommand;
use crate::thingsboard::config::{TbAuth, TbportConfig};

impl ListCommand {
    pub fn run(&self) -> Result<()> {
        let path = self.file.as_ref().map(PathBuf::from);
        let config = TbportConfig::from_file(path.as_ref())?;

        let servers = config.servers.unwrap_or_default();
        if servers.is_empty() {
            println!("❌ No servers found in config file");
            return Ok(());
        }

        for server in servers {
            let marker = if config.active_server.as_deref() == Some(server.name.as_str()) {
                "*"
            } else {
                " "
            };
            let auth = match server.auth {
                TbAuth::Basic(_) => "basic",
                TbAuth::Token(_) => "token",
            };
            println!("{marker} {} ({}, {auth})", server.name, server.endpoint);
        }
        Ok(())
    }
}
