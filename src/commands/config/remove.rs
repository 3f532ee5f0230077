use std::path::PathBuf;

use anyhow::Result;
use inquire::Select;

use super::model::RemoveCommand;
use crate::thingsboard::config::TbportConfig;

impl RemoveCommand {
    pub fn run(&self) -> Result<()> {
        let path = self.file.as_ref().map(PathBuf::from);
        let mut config = TbportConfig::from_file(path.as_ref())?;

        let Some(mut servers) = config.servers.take().filter(|s| !s.is_empty()) else {
            println!("❌ No servers found in config file");
            return Ok(());
        };

        let name = match &self.name {
            Some(name) => name.clone(),
            None => Select::new(
                "name",
                servers.iter().map(|server| server.name.clone()).collect(),
            )
            .prompt()?,
        };

        let before = servers.len();
        servers.retain(|server| server.name != name);
        if servers.len() == before {
            println!("🤔 Server '{name}' not found");
            return Ok(());
        }

        if config.active_server.as_deref() == Some(name.as_str()) {
            config.active_server = None;
        }
        config.servers = Some(servers);
        config.write_to_file()?;

        println!("✅ Config removed successfully!");
        Ok(())
    }
}
