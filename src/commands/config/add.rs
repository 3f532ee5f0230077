use std::path::PathBuf;

use inquire::Select;
use strum::IntoEnumIterator;

use super::model::AddCommand;
use crate::{
    commands::config::model::{env_reference, prompt_proxy_config, validate_endpoint, ConfigOption},
    thingsboard::config::{BasicAuth, ServerConfig, TbAuth, TbportConfig, TokenCmd},
};
use anyhow::Result;

impl AddCommand {
    pub fn run(&self) -> Result<()> {
        let name = inquire::Text::new("name").prompt()?;
        let endpoint = inquire::Text::new("endpoint")
            .with_placeholder("http://localhost:8080")
            .with_validator(validate_endpoint)
            .prompt()?;

        let timeout_secs = inquire::CustomType::<u64>::new("request timeout in seconds")
            .with_default(30)
            .prompt_skippable()?;
        let proxy = prompt_proxy_config(None)?;

        let auth_type =
            Select::new("authentication type", ConfigOption::iter().collect()).prompt()?;

        let auth = match auth_type {
            ConfigOption::BasicAuth => {
                println!("\n📝 Credentials are read from the environment on every run.");
                println!("   Give the variable names only, e.g. TB_USERNAME and TB_PASSWORD.\n");

                let username = inquire::Text::new("username variable")
                    .with_placeholder("TB_USERNAME")
                    .prompt()?;
                let password = inquire::Text::new("password variable")
                    .with_placeholder("TB_PASSWORD")
                    .prompt()?;

                TbAuth::Basic(BasicAuth {
                    username: env_reference(&username),
                    password: env_reference(&password),
                })
            }
            ConfigOption::Token => {
                println!("\n📝 A JWT can be printed by a helper command (e.g. a secrets manager CLI)");
                println!("   or read from an environment variable such as TB_TOKEN.\n");

                let from_command =
                    Select::new("token source", vec!["helper command", "variable"]).prompt()?
                        == "helper command";

                let token = if from_command {
                    let cmd = inquire::Text::new("helper command")
                        .with_placeholder("pass show thingsboard/jwt")
                        .prompt()?;
                    TokenCmd { cmd: Some(cmd), token: None }
                } else {
                    let var_name = inquire::Text::new("token variable")
                        .with_placeholder("TB_TOKEN")
                        .prompt()?;
                    TokenCmd { cmd: None, token: Some(env_reference(&var_name)) }
                };
                TbAuth::Token(token)
            }
        };

        let new_config = ServerConfig {
            name,
            endpoint,
            auth,
            timeout_secs,
            proxy,
        };

        let path = self.file.as_ref().map(PathBuf::from);
        let mut config = TbportConfig::from_file(path.as_ref())?;

        // A custom path wins even when the file did not exist yet
        if let Some(user_path) = path {
            config.path = Some(user_path);
        }

        let mut servers = config.servers.take().unwrap_or_default();
        servers.retain(|server| server.name != new_config.name);
        if servers.is_empty() {
            config.active_server = Some(new_config.name.clone());
        }
        servers.push(new_config);
        config.servers = Some(servers);

        config.write_to_file()?;

        if let Some(path) = &config.path {
            println!("✅ Server added to {}", path.display());
        }
        Ok(())
    }
}
