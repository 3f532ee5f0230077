use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde_json::Value;

use crate::thingsboard::traits::RuleChainOperations;

use super::RestClient;

#[async_trait]
impl RuleChainOperations for RestClient {
    async fn get_rule_chain(&self, rule_chain_id: &str) -> Result<Value> {
        debug!("get_rule_chain called for id: {rule_chain_id}");
        let response = self
            .base_api(Method::GET, &format!("ruleChain/{rule_chain_id}"))
            .await?
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn get_rule_chain_metadata(&self, rule_chain_id: &str) -> Result<Value> {
        let response = self
            .base_api(Method::GET, &format!("ruleChain/{rule_chain_id}/metadata"))
            .await?
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn save_rule_chain(&self, rule_chain: &Value) -> Result<Value> {
        let response = self
            .base_api(Method::POST, "ruleChain")
            .await?
            .json(rule_chain)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn save_rule_chain_metadata(&self, metadata: &Value) -> Result<Value> {
        let response = self
            .base_api(Method::POST, "ruleChain/metadata")
            .await?
            .json(metadata)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
