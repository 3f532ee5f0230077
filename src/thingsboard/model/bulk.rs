use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString};

/// Role of a CSV column in a bulk import job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum BulkImportColumnType {
    Name,
    Type,
    Label,
    SharedAttribute,
    ServerAttribute,
    Timeseries,
    AccessToken,
    X509,
    MqttClientId,
    MqttUserName,
    MqttPassword,
    Lwm2mClientEndpoint,
    Lwm2mClientSecurityConfigMode,
    Lwm2mClientIdentity,
    Lwm2mClientKey,
    Lwm2mClientCert,
    Lwm2mBootstrapServerSecurityMode,
    Lwm2mBootstrapServerPublicKeyOrId,
    Lwm2mBootstrapServerSecretKey,
    Lwm2mServerSecurityMode,
    Lwm2mServerClientPublicKeyOrId,
    Lwm2mServerClientSecretKey,
    SnmpHost,
    SnmpPort,
    SnmpVersion,
    SnmpCommunityString,
    IsGateway,
    Description,
    RoutingKey,
    Secret,
}

impl BulkImportColumnType {
    /// Attribute and timeseries columns are told apart by their key.
    pub fn requires_key(self) -> bool {
        matches!(
            self,
            BulkImportColumnType::SharedAttribute
                | BulkImportColumnType::ServerAttribute
                | BulkImportColumnType::Timeseries
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(rename = "type")]
    pub column_type: BulkImportColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ColumnMapping {
    pub fn new(column_type: BulkImportColumnType) -> Self {
        Self { column_type, key: None }
    }

    pub fn keyed(column_type: BulkImportColumnType, key: &str) -> Self {
        Self {
            column_type,
            key: Some(key.to_string()),
        }
    }

    /// Default role for a header when the user gave no explicit mapping:
    /// well-known headers map to their column, everything else becomes a
    /// server attribute named after the header.
    pub fn guess(header: &str) -> Self {
        let normalized = header.trim().to_lowercase();
        match normalized.as_str() {
            "name" => Self::new(BulkImportColumnType::Name),
            "type" => Self::new(BulkImportColumnType::Type),
            "label" => Self::new(BulkImportColumnType::Label),
            "description" => Self::new(BulkImportColumnType::Description),
            "gateway" | "is_gateway" | "isgateway" => Self::new(BulkImportColumnType::IsGateway),
            "access_token" | "accesstoken" | "access token" => {
                Self::new(BulkImportColumnType::AccessToken)
            }
            _ => Self::keyed(BulkImportColumnType::ServerAttribute, header.trim()),
        }
    }
}

impl FromStr for ColumnMapping {
    type Err = anyhow::Error;

    /// Parses `TYPE` or `TYPE:key`, e.g. `SERVER_ATTRIBUTE:temperature`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (role, key) = match s.split_once(':') {
            Some((role, key)) => (role, Some(key.trim())),
            None => (s, None),
        };
        let column_type = BulkImportColumnType::from_str(role.trim())
            .map_err(|_| anyhow::anyhow!("Unknown column type '{}'", role.trim()))?;
        Ok(Self {
            column_type,
            key: key.filter(|k| !k.is_empty()).map(str::to_string),
        })
    }
}

impl Display for ColumnMapping {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}:{key}", self.column_type),
            None => write!(f, "{}", self.column_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkImportMapping {
    pub columns: Vec<ColumnMapping>,
    pub delimiter: char,
    pub header: bool,
    pub update: bool,
}

/// Payload of `POST api/{entity}/bulk_import`; the backend parses the file itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkImportRequest {
    pub file: String,
    pub mapping: BulkImportMapping,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResult {
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub errors_list: Vec<String>,
}
