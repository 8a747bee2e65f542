use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::cluster::{required, DEFAULT_CHANNEL_GROUP};
use crate::model::{codes, CloudErrorBody};

/// Canonical properties of a node pool nested under a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePoolProperties {
    pub version: NodePoolVersionProfile,
    pub platform: NodePoolPlatformProfile,
    pub replicas: i32,
    pub auto_repair: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_scaling: Option<NodePoolAutoScaling>,
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<Taint>,
    pub node_drain_timeout_minutes: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_service_id: Option<String>,
}

impl Default for NodePoolProperties {
    fn default() -> Self {
        Self {
            version: NodePoolVersionProfile::default(),
            platform: NodePoolPlatformProfile::default(),
            replicas: 0,
            auto_repair: true,
            auto_scaling: None,
            labels: BTreeMap::new(),
            taints: Vec::new(),
            node_drain_timeout_minutes: 0,
            cluster_service_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePoolVersionProfile {
    pub id: String,
    pub channel_group: String,
}

impl Default for NodePoolVersionProfile {
    fn default() -> Self {
        Self {
            id: String::new(),
            channel_group: DEFAULT_CHANNEL_GROUP.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePoolPlatformProfile {
    pub subnet_id: String,
    pub vm_size: String,
    pub enable_encryption_at_host: bool,
    pub os_disk: OsDiskProfile,
    pub availability_zone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DiskStorageAccountType {
    #[default]
    #[serde(rename = "Premium_LRS")]
    PremiumLrs,
    #[serde(rename = "StandardSSD_LRS")]
    StandardSsdLrs,
    #[serde(rename = "Standard_LRS")]
    StandardLrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OsDiskProfile {
    #[serde(rename = "sizeGiB")]
    pub size_gib: i32,
    pub disk_storage_account_type: DiskStorageAccountType,
    pub encryption_set_id: String,
}

impl Default for OsDiskProfile {
    fn default() -> Self {
        Self {
            size_gib: 64,
            disk_storage_account_type: DiskStorageAccountType::PremiumLrs,
            encryption_set_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolAutoScaling {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Effect {
    #[default]
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Taint {
    pub effect: Effect,
    pub key: String,
    pub value: String,
}

impl NodePoolProperties {
    pub fn validate(&self) -> Vec<CloudErrorBody> {
        let mut errors = Vec::new();

        if self.platform.vm_size.is_empty() {
            errors.push(required("properties.platform.vmSize"));
        }
        if self.replicas < 0 {
            errors.push(invalid(
                "properties.replicas",
                "Field 'replicas' must be greater than or equal to 0",
            ));
        }
        if self.platform.os_disk.size_gib < 1 {
            errors.push(invalid(
                "properties.platform.osDisk.sizeGiB",
                "Field 'sizeGiB' must be greater than or equal to 1",
            ));
        }
        if let Some(auto_scaling) = &self.auto_scaling {
            if self.replicas != 0 {
                errors.push(invalid(
                    "properties.replicas",
                    "Field 'replicas' must not be set when 'autoScaling' is set",
                ));
            }
            if auto_scaling.min < 0 || auto_scaling.min > auto_scaling.max {
                errors.push(invalid(
                    "properties.autoScaling",
                    format!(
                        "Invalid autoscaling range min={} max={} (min must be between 0 and max)",
                        auto_scaling.min, auto_scaling.max
                    ),
                ));
            }
        }
        for (index, taint) in self.taints.iter().enumerate() {
            if taint.key.is_empty() {
                errors.push(required(&format!("properties.taints[{index}].key")));
            }
        }

        errors
    }
}

fn invalid(target: &str, message: impl Into<String>) -> CloudErrorBody {
    CloudErrorBody::new(codes::INVALID_REQUEST_CONTENT, message).with_target(target)
}
