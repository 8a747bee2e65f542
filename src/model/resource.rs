use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    codes, CloudErrorBody, ClusterProperties, ETag, ExternalAuthProperties, NodePoolProperties,
    ResourceId, PROVIDER_NAMESPACE,
};

/// Resource types served by this provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    Cluster,
    NodePool,
    ExternalAuth,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [Self::Cluster, Self::NodePool, Self::ExternalAuth];

    /// Path segment of this type inside a resource id.
    pub fn segment(&self) -> &'static str {
        match self {
            Self::Cluster => "hcpOpenShiftClusters",
            Self::NodePool => "nodePools",
            Self::ExternalAuth => "externalAuths",
        }
    }

    pub fn arm_type(&self) -> String {
        match self {
            Self::Cluster => format!("{PROVIDER_NAMESPACE}/hcpOpenShiftClusters"),
            other => format!(
                "{PROVIDER_NAMESPACE}/hcpOpenShiftClusters/{}",
                other.segment()
            ),
        }
    }

    pub fn from_resource_id(id: &ResourceId) -> Option<Self> {
        let arm_type = id.resource_type()?;
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.arm_type().eq_ignore_ascii_case(&arm_type))
    }

    /// Tracked resources carry a location and tags.
    pub fn is_tracked(&self) -> bool {
        !matches!(self, Self::ExternalAuth)
    }

    pub fn is_nested(&self) -> bool {
        !matches!(self, Self::Cluster)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProvisioningState {
    #[default]
    Pending,
    Provisioning,
    Updating,
    Deleting,
    Succeeded,
    Failed,
    Canceled,
}

impl ProvisioningState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatedByType {
    User,
    Application,
    ManagedIdentity,
    Key,
}

/// ARM system metadata, supplied by ARM through a request header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SystemData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_type: Option<CreatedByType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by_type: Option<CreatedByType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ManagedServiceIdentityType {
    #[default]
    None,
    SystemAssigned,
    UserAssigned,
    #[serde(rename = "SystemAssigned,UserAssigned")]
    SystemAndUserAssigned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceIdentity {
    #[serde(rename = "type")]
    pub identity_type: ManagedServiceIdentityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub user_assigned_identities: BTreeMap<String, UserAssignedIdentity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceProperties {
    Cluster(ClusterProperties),
    NodePool(NodePoolProperties),
    ExternalAuth(ExternalAuthProperties),
}

impl ResourceProperties {
    pub fn default_for(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Cluster => Self::Cluster(ClusterProperties::default()),
            ResourceType::NodePool => Self::NodePool(NodePoolProperties::default()),
            ResourceType::ExternalAuth => Self::ExternalAuth(ExternalAuthProperties::default()),
        }
    }
}

/// Version-independent representation of a provider resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDocument {
    pub id: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ManagedServiceIdentity>,
    pub provisioning_state: ProvisioningState,
    pub properties: ResourceProperties,
    /// Concurrency token of the stored copy; lives outside the document body.
    #[serde(skip)]
    pub etag: Option<ETag>,
}

impl ResourceDocument {
    /// A document with every field at its default.
    pub fn new(id: ResourceId, resource_type: ResourceType) -> Self {
        Self {
            id,
            location: None,
            tags: BTreeMap::new(),
            system_data: None,
            identity: None,
            provisioning_state: ProvisioningState::Pending,
            properties: ResourceProperties::default_for(resource_type),
            etag: None,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match &self.properties {
            ResourceProperties::Cluster(_) => ResourceType::Cluster,
            ResourceProperties::NodePool(_) => ResourceType::NodePool,
            ResourceProperties::ExternalAuth(_) => ResourceType::ExternalAuth,
        }
    }

    pub fn name(&self) -> &str {
        self.id.name().unwrap_or_default()
    }

    pub fn as_cluster(&self) -> Option<&ClusterProperties> {
        match &self.properties {
            ResourceProperties::Cluster(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn as_cluster_mut(&mut self) -> Option<&mut ClusterProperties> {
        match &mut self.properties {
            ResourceProperties::Cluster(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn as_node_pool(&self) -> Option<&NodePoolProperties> {
        match &self.properties {
            ResourceProperties::NodePool(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn as_node_pool_mut(&mut self) -> Option<&mut NodePoolProperties> {
        match &mut self.properties {
            ResourceProperties::NodePool(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn as_external_auth(&self) -> Option<&ExternalAuthProperties> {
        match &self.properties {
            ResourceProperties::ExternalAuth(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn as_external_auth_mut(&mut self) -> Option<&mut ExternalAuthProperties> {
        match &mut self.properties {
            ResourceProperties::ExternalAuth(properties) => Some(properties),
            _ => None,
        }
    }

    /// Static validation of the canonical content.
    pub fn validate(&self) -> Vec<CloudErrorBody> {
        match &self.properties {
            ResourceProperties::Cluster(properties) => {
                let mut errors = properties.validate();
                errors.extend(self.validate_operator_identities(properties));
                errors
            }
            ResourceProperties::NodePool(properties) => properties.validate(),
            ResourceProperties::ExternalAuth(properties) => properties.validate(),
        }
    }

    /// Operator identities must be assigned to the cluster, each used once,
    /// and every assigned identity must be used by some operator.
    fn validate_operator_identities(&self, properties: &ClusterProperties) -> Vec<CloudErrorBody> {
        let mut errors = Vec::new();
        let assigned: Vec<String> = self
            .identity
            .as_ref()
            .map(|identity| {
                identity
                    .user_assigned_identities
                    .keys()
                    .map(|key| key.to_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        let mut usage: HashMap<String, Vec<String>> = HashMap::new();
        for (path, identity_id) in properties
            .platform
            .operators_authentication
            .user_assigned_identities
            .references()
        {
            let key = identity_id.to_lowercase();
            if !assigned.contains(&key) {
                errors.push(
                    CloudErrorBody::new(
                        codes::INVALID_REQUEST_CONTENT,
                        format!("identity {identity_id} is not assigned to this resource"),
                    )
                    .with_target(path.clone()),
                );
            }
            usage.entry(key).or_default().push(path);
        }

        for (key, paths) in &usage {
            if paths.len() > 1 {
                errors.push(
                    CloudErrorBody::new(
                        codes::INVALID_REQUEST_CONTENT,
                        format!("identity {key} is used multiple times"),
                    )
                    .with_target(paths.join(", ")),
                );
            }
        }

        for key in &assigned {
            if !usage.contains_key(key) {
                errors.push(
                    CloudErrorBody::new(
                        codes::INVALID_REQUEST_CONTENT,
                        format!("identity {key} is assigned to this resource but not used"),
                    )
                    .with_target("identity.userAssignedIdentities"),
                );
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_id() -> ResourceId {
        ResourceId::provider_resource("sub", "rg", "hcpOpenShiftClusters", "dev")
    }

    #[test]
    fn resource_type_from_id() {
        let cluster = cluster_id();
        assert_eq!(ResourceType::from_resource_id(&cluster), Some(ResourceType::Cluster));
        let pool = cluster.child("nodePools", "workers");
        assert_eq!(ResourceType::from_resource_id(&pool), Some(ResourceType::NodePool));
        let other = cluster.child("widgets", "w");
        assert_eq!(ResourceType::from_resource_id(&other), None);
    }

    #[test]
    fn new_document_is_pending_with_defaults() {
        let doc = ResourceDocument::new(cluster_id(), ResourceType::Cluster);
        assert_eq!(doc.provisioning_state, ProvisioningState::Pending);
        assert_eq!(doc.resource_type(), ResourceType::Cluster);
        assert_eq!(doc.as_cluster(), Some(&ClusterProperties::default()));
    }

    #[test]
    fn unused_and_unassigned_identities_are_reported() {
        let mut doc = ResourceDocument::new(cluster_id(), ResourceType::Cluster);
        let mut identity = ManagedServiceIdentity::default();
        identity
            .user_assigned_identities
            .insert("/ids/unused".into(), UserAssignedIdentity::default());
        doc.identity = Some(identity);

        let properties = doc.as_cluster_mut().unwrap();
        properties.platform.subnet_id = "/subnets/a".into();
        properties
            .platform
            .operators_authentication
            .user_assigned_identities
            .control_plane_operators
            .insert("ingress".into(), "/ids/missing".into());

        let messages: Vec<String> = doc.validate().into_iter().map(|e| e.message).collect();
        assert!(messages.iter().any(|m| m.contains("/ids/missing is not assigned")));
        assert!(messages
            .iter()
            .any(|m| m.contains("/ids/unused is assigned to this resource but not used")));
    }
}
