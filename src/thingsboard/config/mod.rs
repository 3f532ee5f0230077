use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::CONFIG_FILE;

/// Expands environment variables in a string value.
/// Supports ${VAR} and $VAR syntax.
pub fn expand_env_vars(value: &str) -> Result<String> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| anyhow::anyhow!("Failed to expand environment variable in '{value}': {e}"))
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TbportConfig {
    pub servers: Option<Vec<ServerConfig>>,
    pub active_server: Option<String>,
    #[serde(skip_serializing)]
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub name: String,
    pub endpoint: String,
    pub auth: TbAuth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub proxy: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum TbAuth {
    /// Username and password exchanged for a JWT at `api/auth/login`.
    Basic(BasicAuth),
    /// Pre-issued JWT, either literal or printed by a helper command.
    Token(TokenCmd),
}

#[derive(Deserialize, Serialize, Clone, PartialEq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***redacted***")
            .finish()
    }
}

#[derive(Deserialize, Serialize, Clone, PartialEq)]
pub struct TokenCmd {
    pub cmd: Option<String>,
    pub token: Option<String>,
}

impl std::fmt::Debug for TokenCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCmd")
            .field("cmd", &self.cmd)
            .field("token", &self.token.as_ref().map(|_| "***redacted***"))
            .finish()
    }
}

impl Default for TbportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TbportConfig {
    /// Creates an empty config pointing at the default config file.
    pub fn new() -> Self {
        Self {
            servers: None,
            active_server: None,
            path: Some(CONFIG_FILE.as_path().to_path_buf()),
        }
    }

    pub fn from_file(config_path: Option<&PathBuf>) -> Result<Self> {
        let path = config_path
            .filter(|p| p.exists())
            .cloned()
            .unwrap_or_else(|| {
                let default_path = CONFIG_FILE.as_path().to_path_buf();
                info!("Using configuration path: {}", default_path.display());
                default_path
            });

        // A missing file is an empty config
        let toml_config = std::fs::read_to_string(&path).unwrap_or_default();
        let mut config = Self::from_str(&toml_config)?;
        config.path = Some(path);
        Ok(config)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(config: &str) -> Result<Self> {
        let config: TbportConfig = toml::from_str(config)?;
        let num_servers = config.servers.as_ref().map_or(0, Vec::len);
        info!("Loaded config: servers={num_servers}");
        Ok(config)
    }

    /// Picks the server to talk to: the explicitly requested one, else
    /// `active_server`, else the only configured server.
    pub fn select_server(&self, name: Option<&str>) -> Result<&ServerConfig> {
        let servers = self.servers.as_deref().unwrap_or_default();
        let wanted = name.or(self.active_server.as_deref());
        match wanted {
            Some(wanted) => servers
                .iter()
                .find(|s| s.name == wanted)
                .with_context(|| format!("Server '{wanted}' not found in config")),
            None => match servers {
                [only] => Ok(only),
                [] => Err(anyhow::anyhow!(
                    "No servers configured, run `tbport config add` first"
                )),
                _ => Err(anyhow::anyhow!(
                    "Multiple servers configured, pick one with --server or set active_server"
                )),
            },
        }
    }

    pub fn to_str(&self) -> Result<String> {
        toml::to_string(self).map_err(std::convert::Into::into)
    }

    pub fn write_to_file(&self) -> Result<()> {
        let path = self
            .path
            .clone()
            .unwrap_or(CONFIG_FILE.as_path().to_path_buf());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // rw------- since the file may hold credentials
        #[cfg(unix)]
        let mut file = {
            use std::os::unix::fs::OpenOptionsExt;
            OpenOptions::new()
                .read(true)
                .write(true)
                .truncate(true)
                .create(true)
                .mode(0o600)
                .open(&path)?
        };

        #[cfg(not(unix))]
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(true)
            .create(true)
            .open(&path)?;

        file.write_all(self.to_str()?.as_bytes())?;
        Ok(())
    }
}
