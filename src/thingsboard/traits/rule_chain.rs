use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for rule chain operations
#[async_trait]
pub trait RuleChainOperations: Send + Sync {
    async fn get_rule_chain(&self, rule_chain_id: &str) -> Result<Value>;

    async fn get_rule_chain_metadata(&self, rule_chain_id: &str) -> Result<Value>;

    async fn save_rule_chain(&self, rule_chain: &Value) -> Result<Value>;

    /// Store nodes and connections; `metadata.ruleChainId` selects the chain
    async fn save_rule_chain_metadata(&self, metadata: &Value) -> Result<Value>;
}
