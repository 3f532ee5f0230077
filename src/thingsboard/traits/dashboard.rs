use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for dashboard operations
#[async_trait]
pub trait DashboardOperations: Send + Sync {
    /// Fetch a dashboard including its `configuration`
    async fn get_dashboard(&self, dashboard_id: &str) -> Result<Value>;

    /// Create or update a dashboard, returning the stored version
    async fn save_dashboard(&self, dashboard: &Value) -> Result<Value>;
}
