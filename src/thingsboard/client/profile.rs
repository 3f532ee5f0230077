use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde_json::Value;

use crate::thingsboard::traits::{ProfileKind, ProfileOperations};

use super::RestClient;

#[async_trait]
impl ProfileOperations for RestClient {
    async fn get_profile(&self, kind: ProfileKind, profile_id: &str) -> Result<Value> {
        debug!("get_profile called for {kind} {profile_id}");
        let response = self
            .base_api(Method::GET, &format!("{}/{profile_id}", kind.resource()))
            .await?
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn save_profile(&self, kind: ProfileKind, profile: &Value) -> Result<Value> {
        let response = self
            .base_api(Method::POST, kind.resource())
            .await?
            .json(profile)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
