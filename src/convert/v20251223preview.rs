//! API version 2025-12-23-preview.
//!
//! Payloads carrying fields this version does not define are rejected.
//! User-assigned identities missing from a request are dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::convert::{
    find_key, merge_nested, non_empty, rc, rcu, ro, ExternalResource, FieldRule, IdentityMergeRule,
    VersionSchema,
};
use crate::model::{
    self as internal, DiskStorageAccountType, Effect, ExternalAuthClientType,
    ManagedServiceIdentityType, NetworkType, OutboundType, ProvisioningState, ResourceDocument,
    ResourceProperties, ResourceType, SystemData, Visibility,
};

pub struct V20251223Preview;

impl VersionSchema for V20251223Preview {
    const NAME: &'static str = "2025-12-23-preview";
    const IDENTITY_RULES: &'static [(ResourceType, IdentityMergeRule)] = &[
        (ResourceType::Cluster, IdentityMergeRule::Prune),
        (ResourceType::NodePool, IdentityMergeRule::Prune),
        (ResourceType::ExternalAuth, IdentityMergeRule::Prune),
    ];

    type Cluster = HcpOpenShiftCluster;
    type NodePool = NodePool;
    type ExternalAuth = ExternalAuth;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserAssignedIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
}

impl From<&internal::ManagedServiceIdentity> for ManagedServiceIdentity {
    fn from(identity: &internal::ManagedServiceIdentity) -> Self {
        let entries = identity
            .user_assigned_identities
            .iter()
            .map(|(key, entry)| {
                let external = UserAssignedIdentity {
                    client_id: entry.client_id.clone(),
                    principal_id: entry.principal_id.clone(),
                };
                (key.clone(), external)
            })
            .collect();
        Self {
            identity_type: Some(identity.identity_type),
            principal_id: identity.principal_id.clone(),
            tenant_id: identity.tenant_id.clone(),
            user_assigned_identities: Some(entries),
        }
    }
}

impl From<ManagedServiceIdentity> for internal::ManagedServiceIdentity {
    fn from(identity: ManagedServiceIdentity) -> Self {
        let entries = identity
            .user_assigned_identities
            .unwrap_or_default()
            .into_iter()
            .map(|(key, entry)| {
                let canonical = internal::UserAssignedIdentity {
                    client_id: entry.client_id,
                    principal_id: entry.principal_id,
                };
                (key, canonical)
            })
            .collect();
        Self {
            identity_type: identity.identity_type.unwrap_or_default(),
            principal_id: identity.principal_id,
            tenant_id: identity.tenant_id,
            user_assigned_identities: entries,
        }
    }
}

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

    let stored_entries = prior.and_then(|p| p.user_assigned_identities.as_ref());
    for (key, entry) in current.user_assigned_identities.iter_mut().flatten() {
        let stored = stored_entries.and_then(|stored| find_key(stored, key));
        entry.client_id = stored.and_then(|s| s.client_id.clone());
        entry.principal_id = stored.and_then(|s| s.principal_id.clone());
    }

    if rule == IdentityMergeRule::Preserve {
        for (key, entry) in stored_entries.into_iter().flatten() {
            let entries = current
                .user_assigned_identities
                .get_or_insert_with(BTreeMap::new);
            if find_key(entries, key).is_none() {
                entries.insert(key.clone(), entry.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<ClusterAutoscalingProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_drain_timeout_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VersionProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DnsProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_domain_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConsoleProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_cidrs: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OperatorsAuthenticationProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_assigned_identities: Option<UserAssignedIdentitiesProfile>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserAssignedIdentitiesProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane_operators: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_plane_operators: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_managed_identity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClusterAutoscalingProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nodes_total: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pod_grace_period_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_node_provision_time_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_priority_threshold: Option<i32>,
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
    rcu("properties.api.authorizedCidrs[]"),
    rc("properties.platform.managedResourceGroup"),
    rc("properties.platform.subnetId"),
    rc("properties.platform.outboundType"),
    rc("properties.platform.networkSecurityGroupId"),
    rc("properties.platform.operatorsAuthentication.userAssignedIdentities.controlPlaneOperators.*"),
    rc("properties.platform.operatorsAuthentication.userAssignedIdentities.dataPlaneOperators.*"),
    rc("properties.platform.operatorsAuthentication.userAssignedIdentities.serviceManagedIdentity"),
    ro("properties.platform.issuerUrl"),
    rcu("properties.autoscaling.maxNodesTotal"),
    rcu("properties.autoscaling.maxPodGracePeriodSeconds"),
    rcu("properties.autoscaling.maxNodeProvisionTimeSeconds"),
    rcu("properties.autoscaling.podPriorityThreshold"),
    rcu("properties.nodeDrainTimeoutMinutes"),
];

impl ExternalResource for HcpOpenShiftCluster {
    const RESOURCE_TYPE: ResourceType = ResourceType::Cluster;

    fn from_internal(doc: &ResourceDocument) -> Self {
        let defaults = internal::ClusterProperties::default();
        let cluster = doc.as_cluster().unwrap_or(&defaults);
        let operators = &cluster.platform.operators_authentication.user_assigned_identities;

        let properties = ClusterProperties {
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
                authorized_cidrs: Some(cluster.api.authorized_cidrs.clone()),
            }),
            platform: Some(PlatformProfile {
                managed_resource_group: non_empty(&cluster.platform.managed_resource_group),
                subnet_id: non_empty(&cluster.platform.subnet_id),
                outbound_type: Some(cluster.platform.outbound_type),
                network_security_group_id: non_empty(&cluster.platform.network_security_group_id),
                operators_authentication: Some(OperatorsAuthenticationProfile {
                    user_assigned_identities: Some(UserAssignedIdentitiesProfile {
                        control_plane_operators: Some(operators.control_plane_operators.clone()),
                        data_plane_operators: Some(operators.data_plane_operators.clone()),
                        service_managed_identity: non_empty(&operators.service_managed_identity),
                    }),
                }),
                issuer_url: non_empty(&cluster.platform.issuer_url),
            }),
            autoscaling: Some(ClusterAutoscalingProfile {
                max_nodes_total: Some(cluster.autoscaling.max_nodes_total),
                max_pod_grace_period_seconds: Some(
                    cluster.autoscaling.max_pod_grace_period_seconds,
                ),
                max_node_provision_time_seconds: Some(
                    cluster.autoscaling.max_node_provision_time_seconds,
                ),
                pod_priority_threshold: Some(cluster.autoscaling.pod_priority_threshold),
            }),
            node_drain_timeout_minutes: Some(cluster.node_drain_timeout_minutes),
        };

        Self {
            id: Some(doc.id.to_string()),
            name: Some(doc.name().to_string()),
            resource_type: Some(Self::RESOURCE_TYPE.arm_type()),
            location: doc.location.clone(),
            tags: Some(doc.tags.clone()),
            system_data: doc.system_data.clone(),
            identity: doc.identity.as_ref().map(ManagedServiceIdentity::from),
            properties: Some(properties),
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
        base.identity = self.identity.map(Into::into);

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
        cluster.network = internal::NetworkProfile {
            network_type: network.network_type.unwrap_or(defaults.network.network_type),
            pod_cidr: network.pod_cidr.unwrap_or(defaults.network.pod_cidr),
            service_cidr: network.service_cidr.unwrap_or(defaults.network.service_cidr),
            machine_cidr: network.machine_cidr.unwrap_or(defaults.network.machine_cidr),
            host_prefix: network.host_prefix.unwrap_or(defaults.network.host_prefix),
        };

        let console = properties.console.unwrap_or_default();
        cluster.console.url = console.url.unwrap_or(defaults.console.url);

        let api = properties.api.unwrap_or_default();
        cluster.api = internal::ApiProfile {
            url: api.url.unwrap_or(defaults.api.url),
            visibility: api.visibility.unwrap_or(defaults.api.visibility),
            authorized_cidrs: api.authorized_cidrs.unwrap_or(defaults.api.authorized_cidrs),
        };

        let platform = properties.platform.unwrap_or_default();
        let operators = platform
            .operators_authentication
            .and_then(|auth| auth.user_assigned_identities)
            .unwrap_or_default();
        let default_operators = defaults.platform.operators_authentication.user_assigned_identities;
        cluster.platform = internal::PlatformProfile {
            managed_resource_group: platform
                .managed_resource_group
                .unwrap_or(defaults.platform.managed_resource_group),
            subnet_id: platform.subnet_id.unwrap_or(defaults.platform.subnet_id),
            outbound_type: platform.outbound_type.unwrap_or(defaults.platform.outbound_type),
            network_security_group_id: platform
                .network_security_group_id
                .unwrap_or(defaults.platform.network_security_group_id),
            operators_authentication: internal::OperatorsAuthenticationProfile {
                user_assigned_identities: internal::UserAssignedIdentitiesProfile {
                    control_plane_operators: operators
                        .control_plane_operators
                        .unwrap_or(default_operators.control_plane_operators),
                    data_plane_operators: operators
                        .data_plane_operators
                        .unwrap_or(default_operators.data_plane_operators),
                    service_managed_identity: operators
                        .service_managed_identity
                        .unwrap_or(default_operators.service_managed_identity),
                },
            },
            issuer_url: platform.issuer_url.unwrap_or(defaults.platform.issuer_url),
        };

        let autoscaling = properties.autoscaling.unwrap_or_default();
        cluster.autoscaling = internal::ClusterAutoscalingProfile {
            max_nodes_total: autoscaling
                .max_nodes_total
                .unwrap_or(defaults.autoscaling.max_nodes_total),
            max_pod_grace_period_seconds: autoscaling
                .max_pod_grace_period_seconds
                .unwrap_or(defaults.autoscaling.max_pod_grace_period_seconds),
            max_node_provision_time_seconds: autoscaling
                .max_node_provision_time_seconds
                .unwrap_or(defaults.autoscaling.max_node_provision_time_seconds),
            pod_priority_threshold: autoscaling
                .pod_priority_threshold
                .unwrap_or(defaults.autoscaling.pod_priority_threshold),
        };
        cluster.node_drain_timeout_minutes = properties
            .node_drain_timeout_minutes
            .unwrap_or(defaults.node_drain_timeout_minutes);

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

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taints: Option<Vec<Taint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_drain_timeout_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OsDiskProfile {
    #[serde(rename = "sizeGiB", skip_serializing_if = "Option::is_none")]
    pub size_gib: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_storage_account_type: Option<DiskStorageAccountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_set_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodePoolAutoScaling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Taint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<Effect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
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
    rc("properties.platform.osDisk.encryptionSetId"),
    rc("properties.platform.availabilityZone"),
    rcu("properties.replicas"),
    rc("properties.autoRepair"),
    rcu("properties.autoScaling.min"),
    rcu("properties.autoScaling.max"),
    rcu("properties.labels.*"),
    rcu("properties.taints[].effect"),
    rcu("properties.taints[].key"),
    rcu("properties.taints[].value"),
    rcu("properties.nodeDrainTimeoutMinutes"),
];

impl ExternalResource for NodePool {
    const RESOURCE_TYPE: ResourceType = ResourceType::NodePool;

    fn from_internal(doc: &ResourceDocument) -> Self {
        let defaults = internal::NodePoolProperties::default();
        let pool = doc.as_node_pool().unwrap_or(&defaults);
        let os_disk = &pool.platform.os_disk;

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
                        size_gib: Some(os_disk.size_gib),
                        disk_storage_account_type: Some(os_disk.disk_storage_account_type),
                        encryption_set_id: non_empty(&os_disk.encryption_set_id),
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
                taints: Some(
                    pool.taints
                        .iter()
                        .map(|taint| Taint {
                            effect: Some(taint.effect),
                            key: non_empty(&taint.key),
                            value: non_empty(&taint.value),
                        })
                        .collect(),
                ),
                node_drain_timeout_minutes: Some(pool.node_drain_timeout_minutes),
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
        let os_disk = platform.os_disk.unwrap_or_default();
        let default_disk = defaults.platform.os_disk;
        pool.platform = internal::NodePoolPlatformProfile {
            subnet_id: platform.subnet_id.unwrap_or(defaults.platform.subnet_id),
            vm_size: platform.vm_size.unwrap_or(defaults.platform.vm_size),
            enable_encryption_at_host: platform
                .enable_encryption_at_host
                .unwrap_or(defaults.platform.enable_encryption_at_host),
            os_disk: internal::OsDiskProfile {
                size_gib: os_disk.size_gib.unwrap_or(default_disk.size_gib),
                disk_storage_account_type: os_disk
                    .disk_storage_account_type
                    .unwrap_or(default_disk.disk_storage_account_type),
                encryption_set_id: os_disk
                    .encryption_set_id
                    .unwrap_or(default_disk.encryption_set_id),
            },
            availability_zone: platform
                .availability_zone
                .unwrap_or(defaults.platform.availability_zone),
        };

        pool.replicas = properties.replicas.unwrap_or(defaults.replicas);
        pool.auto_repair = properties.auto_repair.unwrap_or(defaults.auto_repair);
        pool.auto_scaling = properties
            .auto_scaling
            .map(|scaling| internal::NodePoolAutoScaling {
                min: scaling.min.unwrap_or_default(),
                max: scaling.max.unwrap_or_default(),
            });
        pool.labels = properties.labels.unwrap_or(defaults.labels);
        pool.taints = properties
            .taints
            .unwrap_or_default()
            .into_iter()
            .map(|taint| internal::Taint {
                effect: taint.effect.unwrap_or_default(),
                key: taint.key.unwrap_or_default(),
                value: taint.value.unwrap_or_default(),
            })
            .collect();
        pool.node_drain_timeout_minutes = properties
            .node_drain_timeout_minutes
            .unwrap_or(defaults.node_drain_timeout_minutes);

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

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokenIssuerProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audiences: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExternalAuthClient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_scopes: Option<Vec<String>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub client_type: Option<ExternalAuthClientType>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
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
    rcu("properties.clients[].type"),
    rcu("properties.claim.usernameClaim"),
    rcu("properties.claim.groupsClaim"),
];

impl ExternalResource for ExternalAuth {
    const RESOURCE_TYPE: ResourceType = ResourceType::ExternalAuth;

    fn from_internal(doc: &ResourceDocument) -> Self {
        let defaults = internal::ExternalAuthProperties::default();
        let auth = doc.as_external_auth().unwrap_or(&defaults);

        let condition = auth.condition.as_ref().map(|condition| ExternalAuthCondition {
            condition_type: non_empty(&condition.condition_type),
            status: non_empty(&condition.status),
            last_transition_time: condition.last_transition_time,
            reason: non_empty(&condition.reason),
            message: non_empty(&condition.message),
        });
        let clients = auth
            .clients
            .iter()
            .map(|client| ExternalAuthClient {
                client_id: non_empty(&client.client_id),
                extra_scopes: Some(client.extra_scopes.clone()),
                client_type: Some(client.client_type),
            })
            .collect();

        Self {
            id: Some(doc.id.to_string()),
            name: Some(doc.name().to_string()),
            resource_type: Some(Self::RESOURCE_TYPE.arm_type()),
            system_data: doc.system_data.clone(),
            properties: Some(ExternalAuthProperties {
                provisioning_state: Some(doc.provisioning_state),
                condition,
                issuer: Some(TokenIssuerProfile {
                    url: non_empty(&auth.issuer.url),
                    audiences: Some(auth.issuer.audiences.clone()),
                }),
                clients: Some(clients),
                claim: Some(ExternalAuthClaimProfile {
                    username_claim: non_empty(&auth.claim.username_claim),
                    groups_claim: non_empty(&auth.claim.groups_claim),
                }),
            }),
        }
    }

    fn into_internal(self, mut base: ResourceDocument) -> ResourceDocument {
        let defaults = internal::ExternalAuthProperties::default();
        let properties = self.properties.unwrap_or_default();

        base.system_data = self.system_data;
        base.provisioning_state = properties.provisioning_state.unwrap_or_default();

        let issuer = properties.issuer.unwrap_or_default();
        let claim = properties.claim.unwrap_or_default();
        let auth = internal::ExternalAuthProperties {
            condition: properties
                .condition
                .map(|condition| internal::ExternalAuthCondition {
                    condition_type: condition.condition_type.unwrap_or_default(),
                    status: condition.status.unwrap_or_default(),
                    last_transition_time: condition.last_transition_time,
                    reason: condition.reason.unwrap_or_default(),
                    message: condition.message.unwrap_or_default(),
                }),
            issuer: internal::TokenIssuerProfile {
                url: issuer.url.unwrap_or(defaults.issuer.url),
                audiences: issuer.audiences.unwrap_or(defaults.issuer.audiences),
            },
            clients: properties
                .clients
                .unwrap_or_default()
                .into_iter()
                .map(|client| internal::ExternalAuthClient {
                    client_id: client.client_id.unwrap_or_default(),
                    extra_scopes: client.extra_scopes.unwrap_or_default(),
                    client_type: client.client_type.unwrap_or_default(),
                })
                .collect(),
            claim: internal::ExternalAuthClaimProfile {
                username_claim: claim.username_claim.unwrap_or(defaults.claim.username_claim),
                groups_claim: claim.groups_claim.unwrap_or(defaults.claim.groups_claim),
            },
        };

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
