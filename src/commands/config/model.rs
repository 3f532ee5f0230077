use anyhow::Result;
use clap::Parser;
use inquire::validator::Validation;
use strum::Display;
use strum::EnumIter;
use url::Url;

#[derive(Parser, Debug)]
pub enum ConfigCommand {
    Add(AddCommand),
    #[clap(alias = "rm")]
    Remove(RemoveCommand),
    #[clap(alias = "ls")]
    List(ListCommand),
}

impl ConfigCommand {
    pub fn run(&self) -> Result<()> {
        match self {
            ConfigCommand::Add(cmd) => cmd.run(),
            ConfigCommand::Remove(cmd) => cmd.run(),
            ConfigCommand::List(cmd) => cmd.run(),
        }
    }
}

#[derive(Parser, Debug)]
pub struct AddCommand {
    #[clap(short, long)]
    pub file: Option<String>,
}

#[derive(Parser, Debug)]
pub struct RemoveCommand {
    pub name: Option<String>,
    #[clap(short, long)]
    pub file: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ListCommand {
    #[clap(short, long)]
    pub file: Option<String>,
}

#[derive(EnumIter, Debug, Display)]
pub enum ConfigOption {
    #[strum(serialize = "username / password")]
    BasicAuth,
    #[strum(serialize = "JWT token")]
    Token,
}

/// Wraps a bare variable name as `${NAME}`; `$NAME` and `${NAME}` are accepted too.
pub fn env_reference(name: &str) -> String {
    format!(
        "${{{}}}",
        name.trim()
            .trim_start_matches('$')
            .trim_start_matches('{')
            .trim_end_matches('}')
    )
}

/// Asks for an optional proxy URL; an empty answer means no proxy.
pub fn prompt_proxy_config(current: Option<&str>) -> Result<Option<String>> {
    let proxy = inquire::Text::new("proxy (leave empty for none)")
        .with_default(current.unwrap_or_default())
        .with_placeholder("http://proxy.example.com:3128")
        .prompt()?;
    let proxy = proxy.trim();
    Ok((!proxy.is_empty()).then(|| proxy.to_string()))
}

#[allow(clippy::unnecessary_wraps)]
pub fn validate_endpoint(
    endpoint: &str,
) -> Result<Validation, Box<dyn std::error::Error + Send + Sync>> {
    match Url::parse(endpoint) {
        Ok(url) => {
            // REST paths are appended by the client
            if url.path().contains("/api") {
                Ok(Validation::Invalid(
                    "⚠️ Endpoint should not include '/api' - it is added automatically.\nExample: Use 'https://thingsboard.example.com' instead of 'https://thingsboard.example.com/api'".into()
                ))
            } else {
                Ok(Validation::Valid)
            }
        }
        Err(error) => Ok(Validation::Invalid(error.into())),
    }
}
