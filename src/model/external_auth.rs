use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::cluster::required;
use crate::model::{codes, CloudErrorBody};

const MAX_AUDIENCES: usize = 10;
const MAX_CLIENTS: usize = 20;

/// Canonical properties of an external OIDC authentication config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalAuthProperties {
    /// Reported by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ExternalAuthCondition>,
    pub issuer: TokenIssuerProfile,
    pub clients: Vec<ExternalAuthClient>,
    pub claim: ExternalAuthClaimProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalAuthCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenIssuerProfile {
    pub url: String,
    pub audiences: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExternalAuthClientType {
    Confidential,
    #[default]
    Public,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalAuthClient {
    pub client_id: String,
    pub extra_scopes: Vec<String>,
    #[serde(rename = "type")]
    pub client_type: ExternalAuthClientType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalAuthClaimProfile {
    pub username_claim: String,
    pub groups_claim: String,
}

impl Default for ExternalAuthClaimProfile {
    fn default() -> Self {
        Self {
            username_claim: "sub".to_string(),
            groups_claim: String::new(),
        }
    }
}

impl ExternalAuthProperties {
    pub fn validate(&self) -> Vec<CloudErrorBody> {
        let mut errors = Vec::new();

        if self.issuer.url.is_empty() {
            errors.push(required("properties.issuer.url"));
        } else if !self.issuer.url.starts_with("https://") {
            errors.push(
                CloudErrorBody::new(
                    codes::INVALID_REQUEST_CONTENT,
                    format!("Invalid issuer URL '{}' (must use https)", self.issuer.url),
                )
                .with_target("properties.issuer.url"),
            );
        }
        if self.issuer.audiences.len() > MAX_AUDIENCES {
            errors.push(
                CloudErrorBody::new(
                    codes::INVALID_REQUEST_CONTENT,
                    format!("At most {MAX_AUDIENCES} audiences are allowed"),
                )
                .with_target("properties.issuer.audiences"),
            );
        }
        if self.clients.len() > MAX_CLIENTS {
            errors.push(
                CloudErrorBody::new(
                    codes::INVALID_REQUEST_CONTENT,
                    format!("At most {MAX_CLIENTS} clients are allowed"),
                )
                .with_target("properties.clients"),
            );
        }
        for (index, client) in self.clients.iter().enumerate() {
            if client.client_id.is_empty() {
                errors.push(required(&format!("properties.clients[{index}].clientId")));
            }
        }

        errors
    }
}
