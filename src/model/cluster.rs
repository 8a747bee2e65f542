use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{codes, CloudErrorBody};

pub const DEFAULT_CHANNEL_GROUP: &str = "stable";

/// Canonical properties of a hosted control-plane cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterProperties {
    pub version: VersionProfile,
    pub dns: DnsProfile,
    pub network: NetworkProfile,
    pub console: ConsoleProfile,
    pub api: ApiProfile,
    pub platform: PlatformProfile,
    pub autoscaling: ClusterAutoscalingProfile,
    pub node_drain_timeout_minutes: i32,
    /// Backend-assigned identifier; never exposed through the public API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_service_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionProfile {
    pub id: String,
    pub channel_group: String,
}

impl Default for VersionProfile {
    fn default() -> Self {
        Self {
            id: String::new(),
            channel_group: DEFAULT_CHANNEL_GROUP.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsProfile {
    pub base_domain: String,
    pub base_domain_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NetworkType {
    #[default]
    #[serde(rename = "OVNKubernetes")]
    OvnKubernetes,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkProfile {
    pub network_type: NetworkType,
    pub pod_cidr: String,
    pub service_cidr: String,
    pub machine_cidr: String,
    pub host_prefix: i32,
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self {
            network_type: NetworkType::OvnKubernetes,
            pod_cidr: "10.128.0.0/14".to_string(),
            service_cidr: "172.30.0.0/16".to_string(),
            machine_cidr: "10.0.0.0/16".to_string(),
            host_prefix: 23,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleProfile {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiProfile {
    pub url: String,
    pub visibility: Visibility,
    pub authorized_cidrs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutboundType {
    #[default]
    LoadBalancer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformProfile {
    pub managed_resource_group: String,
    pub subnet_id: String,
    pub outbound_type: OutboundType,
    pub network_security_group_id: String,
    pub operators_authentication: OperatorsAuthenticationProfile,
    pub issuer_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OperatorsAuthenticationProfile {
    pub user_assigned_identities: UserAssignedIdentitiesProfile,
}

/// Operator name to user-assigned identity resource id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserAssignedIdentitiesProfile {
    pub control_plane_operators: BTreeMap<String, String>,
    pub data_plane_operators: BTreeMap<String, String>,
    pub service_managed_identity: String,
}

impl UserAssignedIdentitiesProfile {
    /// Every identity reference with the JSON path it came from.
    pub fn references(&self) -> Vec<(String, &str)> {
        let base = "properties.platform.operatorsAuthentication.userAssignedIdentities";
        let mut refs: Vec<(String, &str)> = self
            .control_plane_operators
            .iter()
            .map(|(operator, id)| {
                (format!("{base}.controlPlaneOperators[{operator}]"), id.as_str())
            })
            .chain(self.data_plane_operators.iter().map(|(operator, id)| {
                (format!("{base}.dataPlaneOperators[{operator}]"), id.as_str())
            }))
            .collect();
        if !self.service_managed_identity.is_empty() {
            refs.push((
                format!("{base}.serviceManagedIdentity"),
                self.service_managed_identity.as_str(),
            ));
        }
        refs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterAutoscalingProfile {
    pub max_nodes_total: i32,
    pub max_pod_grace_period_seconds: i32,
    pub max_node_provision_time_seconds: i32,
    pub pod_priority_threshold: i32,
}

impl Default for ClusterAutoscalingProfile {
    fn default() -> Self {
        Self {
            max_nodes_total: 0,
            max_pod_grace_period_seconds: 600,
            max_node_provision_time_seconds: 900,
            pod_priority_threshold: -10,
        }
    }
}

impl ClusterProperties {
    pub fn validate(&self) -> Vec<CloudErrorBody> {
        let mut errors = Vec::new();

        if self.platform.subnet_id.is_empty() {
            errors.push(required("properties.platform.subnetId"));
        }
        if !(23..=26).contains(&self.network.host_prefix) {
            errors.push(
                CloudErrorBody::new(
                    codes::INVALID_REQUEST_CONTENT,
                    format!(
                        "Invalid value '{}' for field 'hostPrefix' (must be between 23 and 26)",
                        self.network.host_prefix
                    ),
                )
                .with_target("properties.network.hostPrefix"),
            );
        }
        for (field, cidr) in [
            ("podCidr", &self.network.pod_cidr),
            ("serviceCidr", &self.network.service_cidr),
            ("machineCidr", &self.network.machine_cidr),
        ] {
            if !looks_like_cidr(cidr) {
                errors.push(
                    CloudErrorBody::new(
                        codes::INVALID_REQUEST_CONTENT,
                        format!("Invalid value '{cidr}' for field '{field}' (must be a CIDR)"),
                    )
                    .with_target(format!("properties.network.{field}")),
                );
            }
        }
        if !(0..=10080).contains(&self.node_drain_timeout_minutes) {
            errors.push(
                CloudErrorBody::new(
                    codes::INVALID_REQUEST_CONTENT,
                    "Field 'nodeDrainTimeoutMinutes' must be between 0 and 10080",
                )
                .with_target("properties.nodeDrainTimeoutMinutes"),
            );
        }

        errors
    }
}

pub(crate) fn required(target: &str) -> CloudErrorBody {
    let field = target.rsplit('.').next().unwrap_or(target);
    CloudErrorBody::new(
        codes::INVALID_REQUEST_CONTENT,
        format!("Missing required field '{field}'"),
    )
    .with_target(target)
}

fn looks_like_cidr(value: &str) -> bool {
    let Some((address, prefix)) = value.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    address.parse::<std::net::IpAddr>().is_ok() && prefix <= 128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_provider_documentation() {
        let properties = ClusterProperties::default();
        assert_eq!(properties.version.channel_group, "stable");
        assert_eq!(properties.network.host_prefix, 23);
        assert_eq!(properties.network.pod_cidr, "10.128.0.0/14");
        assert_eq!(properties.api.visibility, Visibility::Public);
        assert_eq!(properties.autoscaling.max_node_provision_time_seconds, 900);
    }

    #[test]
    fn validation_reports_every_problem() {
        let mut properties = ClusterProperties::default();
        properties.network.host_prefix = 30;
        properties.network.pod_cidr = "nonsense".to_string();
        let errors = properties.validate();
        let targets: Vec<_> = errors.iter().filter_map(|e| e.target.as_deref()).collect();
        assert_eq!(
            targets,
            vec![
                "properties.platform.subnetId",
                "properties.network.hostPrefix",
                "properties.network.podCidr"
            ]
        );
    }

    #[test]
    fn valid_cluster_has_no_findings() {
        let mut properties = ClusterProperties::default();
        properties.platform.subnet_id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets/a".into();
        assert!(properties.validate().is_empty());
    }
}
