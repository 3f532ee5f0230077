use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde_json::Value;

use crate::thingsboard::traits::DashboardOperations;

use super::RestClient;

#[async_trait]
impl DashboardOperations for RestClient {
    async fn get_dashboard(&self, dashboard_id: &str) -> Result<Value> {
        debug!("get_dashboard called for id: {dashboard_id}");
        let response = self
            .base_api(Method::GET, &format!("dashboard/{dashboard_id}"))
            .await?
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn save_dashboard(&self, dashboard: &Value) -> Result<Value> {
        let response = self
            .base_api(Method::POST, "dashboard")
            .await?
            .json(dashboard)
            .send()
            .await?
            .error_for_status()?;
        let saved: Value = response.json().await?;
        debug!("Saved dashboard: {}", saved["title"]);
        Ok(saved)
    }
}
