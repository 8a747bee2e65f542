//! API version 2024-06-10-preview.
//!
//! Unknown JSON fields are ignored. User-assigned identities missing from a
//! request are preserved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::convert::{
    find_key, merge_nested, non_empty, rc, rcu, ro, ExternalResource, FieldRule, IdentityMergeRule,
    VersionSchema,
};
use crate::model::{
    self as internal, DiskStorageAccountType, ManagedServiceIdentityType, NetworkType, OutboundType,
    ProvisioningState, ResourceDocument, ResourceProperties, ResourceType, SystemData, Visibility,
};

pub struct V20240610Preview;

impl VersionSchema for V20240610Preview {
    const NAME: &'static str = "2024-06-10-preview";
    const IDENTITY_RULES: &'static [(ResourceType, IdentityMergeRule)] = &[
        (ResourceType::Cluster, IdentityMergeRule::Preserve),
        (ResourceType::NodePool, IdentityMergeRule::Preserve),
        (ResourceType::ExternalAuth, IdentityMergeRule::Preserve),
    ];

    type Cluster = HcpOpenShiftCluster;
    type NodePool = NodePool;
    type ExternalAuth = ExternalAuth;
}

// Identity

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceIdentity {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub identity_type: Option<ManagedServiceIdentityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_assigned_identities: Option<BTreeMap<String, UserAssignedIdentity>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
}

impl ManagedServiceIdentity {
    fn from_internal(identity: &internal::ManagedServiceIdentity) -> Self {
        Self {
            identity_type: Some(identity.identity_type),
            principal_id: identity.principal_id.clone(),
            tenant_id: identity.tenant_id.clone(),
            user_assigned_identities: Some(
                identity
                    .user_assigned_identities
                    .iter()
                    .map(|(key, entry)| {
                        (
                            key.clone(),
                            UserAssignedIdentity {
                                client_id: entry.client_id.clone(),
                                principal_id: entry.principal_id.clone(),
                            },
                        )
                    })
                    .collect(),
            ),
        }
    }

    fn into_internal(self) -> internal::ManagedServiceIdentity {
        internal::ManagedServiceIdentity {
            identity_type: self.identity_type.unwrap_or_default(),
            principal_id: self.principal_id,
            tenant_id: self.tenant_id,
            user_assigned_identities: self
                .user_assigned_identities
                .unwrap_or_default()
                .into_iter()
                .map(|(key, entry)| {
                    (
                        key,
                        internal::UserAssignedIdentity {
                            client_id: entry.client_id,
                            principal_id: entry.principal_id,
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Three-way merge of the identity block.
fn copy_identity(
    incoming: &mut Option<ManagedServiceIdentity>,
    prior: Option<&ManagedServiceIdentity>,
    rule: IdentityMergeRule,
) {
    let Some(current) = incoming.as_mut() else {
        if rule == IdentityMergeRule::Preserve {
            *incoming = prior.cloned();
        }
        return;
    };

    current.principal_id = prior.and_then(|p| p.principal_id.clone());
    current.tenant_id = prior.and_then(|p| p.tenant_id.clone());

    let prior_entries = prior.and_then(|p| p.user_assigned_identities.as_ref());
    if let Some(entries) = current.user_assigned_identities.as_mut() {
        for (key, entry) in entries.iter_mut() {
            let stored = prior_entries.and_then(|stored| find_key(stored, key));
            entry.client_id = stored.and_then(|s| s.client_id.clone());
            entry.principal_id = stored.and_then(|s| s.principal_id.clone());
        }
    }

    if rule == IdentityMergeRule::Preserve {
        if let Some(stored) = prior_entries {
            let entries = current
                .user_assigned_identities
                .get_or_insert_with(BTreeMap::new);
            for (key, entry) in stored {
                if find_key(entries, key).is_none() {
                    entries.insert(key.clone(), entry.clone());
                }
            }
        }
    }
}

// Cluster

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HcpOpenShiftCluster {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<ManagedServiceIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ClusterProperties>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console: Option<ConsoleProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformProfile>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_domain_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_type: Option<NetworkType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_prefix: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_resource_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbound_type: Option<OutboundType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_security_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operators_authentication: Option<OperatorsAuthenticationProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorsAuthenticationProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_assigned_identities: Option<UserAssignedIdentitiesProfile>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedIdentitiesProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane_operators: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_plane_operators: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_managed_identity: Option<String>,
}

const CLUSTER_FIELDS: &[FieldRule] = &[
    ro("id"),
    ro("name"),
    ro("type"),
    rc("location"),
    rcu("tags.*"),
    ro("systemData.createdBy"),
    ro("systemData.createdByType"),
    ro("systemData.createdAt"),
    ro("systemData.lastModifiedBy"),
    ro("systemData.lastModifiedByType"),
    ro("systemData.lastModifiedAt"),
    rcu("identity.type"),
    ro("identity.principalId"),
    ro("identity.tenantId"),
    ro("identity.userAssignedIdentities.*.clientId"),
    ro("identity.userAssignedIdentities.*.principalId"),
    ro("properties.provisioningState"),
    rc("properties.version.id"),
    rcu("properties.version.channelGroup"),
    ro("properties.dns.baseDomain"),
    rc("properties.dns.baseDomainPrefix"),
    rc("properties.network.networkType"),
    rc("properties.network.podCidr"),
    rc("properties.network.serviceCidr"),
    rc("properties.network.machineCidr"),
    rc("properties.network.hostPrefix"),
    ro("properties.console.url"),
    ro("properties.api.url"),
    rc("properties.api.visibility"),
    rc("properties.platform.managedResourceGroup"),
    rc("properties.platform.subnetId"),
    rc("properties.platform.outboundType"),
    rc("properties.platform.networkSecurityGroupId"),
    rc("properties.platform.operatorsAuthentication.userAssignedIdentities.controlPlaneOperators.*"),
    rc("properties.platform.operatorsAuthentication.userAssignedIdentities.dataPlaneOperators.*"),
    rc("properties.platform.operatorsAuthentication.userAssignedIdentities.serviceManagedIdentity"),
    ro("properties.platform.issuerUrl"),
];

impl ExternalResource for HcpOpenShiftCluster {
    const RESOURCE_TYPE: ResourceType = ResourceType::Cluster;

    fn from_internal(doc: &ResourceDocument) -> Self {
        let defaults = internal::ClusterProperties::default();
        let cluster = doc.as_cluster().unwrap_or(&defaults);
        let identities = &cluster.platform.operators_authentication.user_assigned_identities;

        Self {
            id: Some(doc.id.to_string()),
            name: Some(doc.name().to_string()),
            resource_type: Some(Self::RESOURCE_TYPE.arm_type()),
            location: doc.location.clone(),
            tags: Some(doc.tags.clone()),
            system_data: doc.system_data.clone(),
            identity: doc.identity.as_ref().map(ManagedServiceIdentity::from_internal),
            properties: Some(ClusterProperties {
                provisioning_state: Some(doc.provisioning_state),
                version: Some(VersionProfile {
                    id: non_empty(&cluster.version.id),
                    channel_group: non_empty(&cluster.version.channel_group),
                }),
                dns: Some(DnsProfile {
                    base_domain: non_empty(&cluster.dns.base_domain),
                    base_domain_prefix: non_empty(&cluster.dns.base_domain_prefix),
                }),
                network: Some(NetworkProfile {
                    network_type: Some(cluster.network.network_type),
                    pod_cidr: non_empty(&cluster.network.pod_cidr),
                    service_cidr: non_empty(&cluster.network.service_cidr),
                    machine_cidr: non_empty(&cluster.network.machine_cidr),
                    host_prefix: Some(cluster.network.host_prefix),
                }),
                console: Some(ConsoleProfile {
                    url: non_empty(&cluster.console.url),
                }),
                api: Some(ApiProfile {
                    url: non_empty(&cluster.api.url),
                    visibility: Some(cluster.api.visibility),
                }),
                platform: Some(PlatformProfile {
                    managed_resource_group: non_empty(&cluster.platform.managed_resource_group),
                    subnet_id: non_empty(&cluster.platform.subnet_id),
                    outbound_type: Some(cluster.platform.outbound_type),
                    network_security_group_id: non_empty(
                        &cluster.platform.network_security_group_id,
                    ),
                    operators_authentication: Some(OperatorsAuthenticationProfile {
                        user_assigned_identities: Some(UserAssignedIdentitiesProfile {
                            control_plane_operators: Some(
                                identities.control_plane_operators.clone(),
                            ),
                            data_plane_operators: Some(identities.data_plane_operators.clone()),
                            service_managed_identity: non_empty(
                                &identities.service_managed_identity,
                            ),
                        }),
                    }),
                    issuer_url: non_empty(&cluster.platform.issuer_url),
                }),
            }),
        }
    }

    fn into_internal(self, mut base: ResourceDocument) -> ResourceDocument {
        let defaults = internal::ClusterProperties::default();
        let mut cluster = base.as_cluster().cloned().unwrap_or_default();

        base.location = self.location;
        if let Some(tags) = self.tags {
            base.tags = tags;
        }
        base.system_data = self.system_data;
        base.identity = self.identity.map(ManagedServiceIdentity::into_internal);

        let properties = self.properties.unwrap_or_default();
        base.provisioning_state = properties.provisioning_state.unwrap_or_default();

        let version = properties.version.unwrap_or_default();
        cluster.version.id = version.id.unwrap_or(defaults.version.id);
        cluster.version.channel_group = version
            .channel_group
            .unwrap_or(defaults.version.channel_group);

        let dns = properties.dns.unwrap_or_default();
        cluster.dns.base_domain = dns.base_domain.unwrap_or(defaults.dns.base_domain);
        cluster.dns.base_domain_prefix = dns
            .base_domain_prefix
            .unwrap_or(defaults.dns.base_domain_prefix);

        let network = properties.network.unwrap_or_default();
        cluster.network.network_type = network
            .network_type
            .unwrap_or(defaults.network.network_type);
        cluster.network.pod_cidr = network.pod_cidr.unwrap_or(defaults.network.pod_cidr);
        cluster.network.service_cidr = network
            .service_cidr
            .unwrap_or(defaults.network.service_cidr);
        cluster.network.machine_cidr = network
            .machine_cidr
            .unwrap_or(defaults.network.machine_cidr);
        cluster.network.host_prefix = network.host_prefix.unwrap_or(defaults.network.host_prefix);

        let console = properties.console.unwrap_or_default();
        cluster.console.url = console.url.unwrap_or(defaults.console.url);

        let api = properties.api.unwrap_or_default();
        cluster.api.url = api.url.unwrap_or(defaults.api.url);
        cluster.api.visibility = api.visibility.unwrap_or(defaults.api.visibility);

        let platform = properties.platform.unwrap_or_default();
        cluster.platform.managed_resource_group = platform
            .managed_resource_group
            .unwrap_or(defaults.platform.managed_resource_group);
        cluster.platform.subnet_id = platform.subnet_id.unwrap_or(defaults.platform.subnet_id);
        cluster.platform.outbound_type = platform
            .outbound_type
            .unwrap_or(defaults.platform.outbound_type);
        cluster.platform.network_security_group_id = platform
            .network_security_group_id
            .unwrap_or(defaults.platform.network_security_group_id);
        cluster.platform.issuer_url = platform.issuer_url.unwrap_or(defaults.platform.issuer_url);

        let identities = platform
            .operators_authentication
            .and_then(|auth| auth.user_assigned_identities)
            .unwrap_or_default();
        let default_identities = defaults
            .platform
            .operators_authentication
            .user_assigned_identities;
        let target = &mut cluster.platform.operators_authentication.user_assigned_identities;
        target.control_plane_operators = identities
            .control_plane_operators
            .unwrap_or(default_identities.control_plane_operators);
        target.data_plane_operators = identities
            .data_plane_operators
            .unwrap_or(default_identities.data_plane_operators);
        target.service_managed_identity = identities
            .service_managed_identity
            .unwrap_or(default_identities.service_managed_identity);

        base.properties = ResourceProperties::Cluster(cluster);
        base
    }

    fn copy_read_only_fields(&mut self, prior: &Self, identity_rule: IdentityMergeRule) {
        self.id = prior.id.clone();
        self.name = prior.name.clone();
        self.resource_type = prior.resource_type.clone();
        self.system_data = prior.system_data.clone();
        copy_identity(&mut self.identity, prior.identity.as_ref(), identity_rule);

        merge_nested(&mut self.properties, prior.properties.as_ref(), |current, prior| {
            current.provisioning_state = prior.provisioning_state;
            merge_nested(&mut current.dns, prior.dns.as_ref(), |current, prior| {
                current.base_domain = prior.base_domain.clone();
            });
            merge_nested(&mut current.console, prior.console.as_ref(), |current, prior| {
                current.url = prior.url.clone();
            });
            merge_nested(&mut current.api, prior.api.as_ref(), |current, prior| {
                current.url = prior.url.clone();
            });
            merge_nested(&mut current.platform, prior.platform.as_ref(), |current, prior| {
                current.issuer_url = prior.issuer_url.clone();
            });
        });
    }

    fn field_inventory() -> &'static [FieldRule] {
        CLUSTER_FIELDS
    }
}

// Node pool

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<NodePoolProperties>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<NodePoolPlatformProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_repair: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_scaling: Option<NodePoolAutoScaling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolPlatformProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_encryption_at_host: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_disk: Option<OsDiskProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDiskProfile {
    #[serde(rename = "sizeGiB", skip_serializing_if = "Option::is_none")]
    pub size_gib: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_storage_account_type: Option<DiskStorageAccountType>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolAutoScaling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
}

const NODE_POOL_FIELDS: &[FieldRule] = &[
    ro("id"),
    ro("name"),
    ro("type"),
    rc("location"),
    rcu("tags.*"),
    ro("systemData.createdBy"),
    ro("systemData.createdByType"),
    ro("systemData.createdAt"),
    ro("systemData.lastModifiedBy"),
    ro("systemData.lastModifiedByType"),
    ro("systemData.lastModifiedAt"),
    ro("properties.provisioningState"),
    rcu("properties.version.id"),
    rcu("properties.version.channelGroup"),
    rc("properties.platform.subnetId"),
    rc("properties.platform.vmSize"),
    rc("properties.platform.enableEncryptionAtHost"),
    rc("properties.platform.osDisk.sizeGiB"),
    rc("properties.platform.osDisk.diskStorageAccountType"),
    rc("properties.platform.availabilityZone"),
    rcu("properties.replicas"),
    rc("properties.autoRepair"),
    rcu("properties.autoScaling.min"),
    rcu("properties.autoScaling.max"),
    rcu("properties.labels.*"),
];

impl ExternalResource for NodePool {
    const RESOURCE_TYPE: ResourceType = ResourceType::NodePool;

    fn from_internal(doc: &ResourceDocument) -> Self {
        let defaults = internal::NodePoolProperties::default();
        let pool = doc.as_node_pool().unwrap_or(&defaults);

        Self {
            id: Some(doc.id.to_string()),
            name: Some(doc.name().to_string()),
            resource_type: Some(Self::RESOURCE_TYPE.arm_type()),
            location: doc.location.clone(),
            tags: Some(doc.tags.clone()),
            system_data: doc.system_data.clone(),
            properties: Some(NodePoolProperties {
                provisioning_state: Some(doc.provisioning_state),
                version: Some(VersionProfile {
                    id: non_empty(&pool.version.id),
                    channel_group: non_empty(&pool.version.channel_group),
                }),
                platform: Some(NodePoolPlatformProfile {
                    subnet_id: non_empty(&pool.platform.subnet_id),
                    vm_size: non_empty(&pool.platform.vm_size),
                    enable_encryption_at_host: Some(pool.platform.enable_encryption_at_host),
                    os_disk: Some(OsDiskProfile {
                        size_gib: Some(pool.platform.os_disk.size_gib),
                        disk_storage_account_type: Some(
                            pool.platform.os_disk.disk_storage_account_type,
                        ),
                    }),
                    availability_zone: non_empty(&pool.platform.availability_zone),
                }),
                replicas: Some(pool.replicas),
                auto_repair: Some(pool.auto_repair),
                auto_scaling: pool.auto_scaling.map(|scaling| NodePoolAutoScaling {
                    min: Some(scaling.min),
                    max: Some(scaling.max),
                }),
                labels: Some(pool.labels.clone()),
            }),
        }
    }

    fn into_internal(self, mut base: ResourceDocument) -> ResourceDocument {
        let defaults = internal::NodePoolProperties::default();
        let mut pool = base.as_node_pool().cloned().unwrap_or_default();

        base.location = self.location;
        if let Some(tags) = self.tags {
            base.tags = tags;
        }
        base.system_data = self.system_data;

        let properties = self.properties.unwrap_or_default();
        base.provisioning_state = properties.provisioning_state.unwrap_or_default();

        let version = properties.version.unwrap_or_default();
        pool.version.id = version.id.unwrap_or(defaults.version.id);
        pool.version.channel_group = version
            .channel_group
            .unwrap_or(defaults.version.channel_group);

        let platform = properties.platform.unwrap_or_default();
        pool.platform.subnet_id = platform.subnet_id.unwrap_or(defaults.platform.subnet_id);
        pool.platform.vm_size = platform.vm_size.unwrap_or(defaults.platform.vm_size);
        pool.platform.enable_encryption_at_host = platform
            .enable_encryption_at_host
            .unwrap_or(defaults.platform.enable_encryption_at_host);
        pool.platform.availability_zone = platform
            .availability_zone
            .unwrap_or(defaults.platform.availability_zone);
        let os_disk = platform.os_disk.unwrap_or_default();
        pool.platform.os_disk.size_gib = os_disk
            .size_gib
            .unwrap_or(defaults.platform.os_disk.size_gib);
        pool.platform.os_disk.disk_storage_account_type = os_disk
            .disk_storage_account_type
            .unwrap_or(defaults.platform.os_disk.disk_storage_account_type);

        pool.replicas = properties.replicas.unwrap_or(defaults.replicas);
        pool.auto_repair = properties.auto_repair.unwrap_or(defaults.auto_repair);
        pool.auto_scaling = properties
            .auto_scaling
            .map(|scaling| internal::NodePoolAutoScaling {
                min: scaling.min.unwrap_or_default(),
                max: scaling.max.unwrap_or_default(),
            });
        pool.labels = properties.labels.unwrap_or(defaults.labels);

        base.properties = ResourceProperties::NodePool(pool);
        base
    }

    fn copy_read_only_fields(&mut self, prior: &Self, _identity_rule: IdentityMergeRule) {
        self.id = prior.id.clone();
        self.name = prior.name.clone();
        self.resource_type = prior.resource_type.clone();
        self.system_data = prior.system_data.clone();

        merge_nested(&mut self.properties, prior.properties.as_ref(), |current, prior| {
            current.provisioning_state = prior.provisioning_state;
        });
    }

    fn field_inventory() -> &'static [FieldRule] {
        NODE_POOL_FIELDS
    }
}

// External auth

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAuth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ExternalAuthProperties>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAuthProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ExternalAuthCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<TokenIssuerProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<ExternalAuthClient>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<ExternalAuthClaimProfile>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAuthCondition {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenIssuerProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audiences: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAuthClient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_scopes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAuthClaimProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username_claim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups_claim: Option<String>,
}

const EXTERNAL_AUTH_FIELDS: &[FieldRule] = &[
    ro("id"),
    ro("name"),
    ro("type"),
    ro("systemData.createdBy"),
    ro("systemData.createdByType"),
    ro("systemData.createdAt"),
    ro("systemData.lastModifiedBy"),
    ro("systemData.lastModifiedByType"),
    ro("systemData.lastModifiedAt"),
    ro("properties.provisioningState"),
    ro("properties.condition.type"),
    ro("properties.condition.status"),
    ro("properties.condition.lastTransitionTime"),
    ro("properties.condition.reason"),
    ro("properties.condition.message"),
    rcu("properties.issuer.url"),
    rcu("properties.issuer.audiences[]"),
    rcu("properties.clients[].clientId"),
    rcu("properties.clients[].extraScopes[]"),
    rcu("properties.claim.usernameClaim"),
    rcu("properties.claim.groupsClaim"),
];

impl ExternalResource for ExternalAuth {
    const RESOURCE_TYPE: ResourceType = ResourceType::ExternalAuth;

    fn from_internal(doc: &ResourceDocument) -> Self {
        let defaults = internal::ExternalAuthProperties::default();
        let auth = doc.as_external_auth().unwrap_or(&defaults);

        Self {
            id: Some(doc.id.to_string()),
            name: Some(doc.name().to_string()),
            resource_type: Some(Self::RESOURCE_TYPE.arm_type()),
            system_data: doc.system_data.clone(),
            properties: Some(ExternalAuthProperties {
                provisioning_state: Some(doc.provisioning_state),
                condition: auth.condition.as_ref().map(|condition| ExternalAuthCondition {
                    condition_type: non_empty(&condition.condition_type),
                    status: non_empty(&condition.status),
                    last_transition_time: condition.last_transition_time,
                    reason: non_empty(&condition.reason),
                    message: non_empty(&condition.message),
                }),
                issuer: Some(TokenIssuerProfile {
                    url: non_empty(&auth.issuer.url),
                    audiences: Some(auth.issuer.audiences.clone()),
                }),
                clients: Some(
                    auth.clients
                        .iter()
                        .map(|client| ExternalAuthClient {
                            client_id: non_empty(&client.client_id),
                            extra_scopes: Some(client.extra_scopes.clone()),
                        })
                        .collect(),
                ),
                claim: Some(ExternalAuthClaimProfile {
                    username_claim: non_empty(&auth.claim.username_claim),
                    groups_claim: non_empty(&auth.claim.groups_claim),
                }),
            }),
        }
    }

    fn into_internal(self, mut base: ResourceDocument) -> ResourceDocument {
        let defaults = internal::ExternalAuthProperties::default();
        let mut auth = base.as_external_auth().cloned().unwrap_or_default();
        let stored_clients = std::mem::take(&mut auth.clients);

        base.system_data = self.system_data;

        let properties = self.properties.unwrap_or_default();
        base.provisioning_state = properties.provisioning_state.unwrap_or_default();

        auth.condition = properties
            .condition
            .map(|condition| internal::ExternalAuthCondition {
                condition_type: condition.condition_type.unwrap_or_default(),
                status: condition.status.unwrap_or_default(),
                last_transition_time: condition.last_transition_time,
                reason: condition.reason.unwrap_or_default(),
                message: condition.message.unwrap_or_default(),
            });

        let issuer = properties.issuer.unwrap_or_default();
        auth.issuer.url = issuer.url.unwrap_or(defaults.issuer.url);
        auth.issuer.audiences = issuer.audiences.unwrap_or(defaults.issuer.audiences);

        // Client fields this version does not expose survive by position.
        auth.clients = properties
            .clients
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, client)| {
                let mut merged = stored_clients.get(index).cloned().unwrap_or_default();
                merged.client_id = client.client_id.unwrap_or_default();
                merged.extra_scopes = client.extra_scopes.unwrap_or_default();
                merged
            })
            .collect();

        let claim = properties.claim.unwrap_or_default();
        auth.claim.username_claim = claim
            .username_claim
            .unwrap_or(defaults.claim.username_claim);
        auth.claim.groups_claim = claim.groups_claim.unwrap_or(defaults.claim.groups_claim);

        base.properties = ResourceProperties::ExternalAuth(auth);
        base
    }

    fn copy_read_only_fields(&mut self, prior: &Self, _identity_rule: IdentityMergeRule) {
        self.id = prior.id.clone();
        self.name = prior.name.clone();
        self.resource_type = prior.resource_type.clone();
        self.system_data = prior.system_data.clone();

        merge_nested(&mut self.properties, prior.properties.as_ref(), |current, prior| {
            current.provisioning_state = prior.provisioning_state;
            current.condition = prior.condition.clone();
        });
    }

    fn field_inventory() -> &'static [FieldRule] {
        EXTERNAL_AUTH_FIELDS
    }
}
