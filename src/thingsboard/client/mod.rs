pub mod base;

mod dashboard;
mod entity;
mod profile;
mod rule_chain;
mod widget;

use anyhow::Result;
use reqwest::Method;

pub use base::BaseClient;

use super::config::ServerConfig;

/// REST implementation of [`crate::thingsboard::traits::TbClient`].
#[derive(Debug, Clone)]
pub struct RestClient {
    base: BaseClient,
}

impl RestClient {
    pub fn new(base: BaseClient) -> Self {
        Self { base }
    }

    async fn base_api(&self, method: Method, endpoint: &str) -> Result<reqwest::RequestBuilder> {
        self.base.base_api(method, endpoint).await
    }
}

impl TryFrom<&ServerConfig> for RestClient {
    type Error = anyhow::Error;

    fn try_from(config: &ServerConfig) -> Result<Self, Self::Error> {
        Ok(Self::new(BaseClient::try_from(config)?))
    }
}
