use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProfileKind {
    #[strum(serialize = "device profile")]
    Device,
    #[strum(serialize = "asset profile")]
    Asset,
    #[strum(serialize = "tenant profile")]
    Tenant,
}

impl ProfileKind {
    pub fn resource(self) -> &'static str {
        match self {
            ProfileKind::Device => "deviceProfile",
            ProfileKind::Asset => "assetProfile",
            ProfileKind::Tenant => "tenantProfile",
        }
    }
}

/// Trait for device, asset and tenant profile operations
#[async_trait]
pub trait ProfileOperations: Send + Sync {
    async fn get_profile(&self, kind: ProfileKind, profile_id: &str) -> Result<Value>;

    async fn save_profile(&self, kind: ProfileKind, profile: &Value) -> Result<Value>;
}
