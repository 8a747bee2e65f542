//! Versioned conversion between ARM wire payloads and canonical documents.
//!
//! Each API version owns an independent set of external types. Every
//! external type maps its fields onto the canonical model by hand, including
//! the read-only carry-over from the stored copy, so no version can affect
//! another and nothing depends on reflection.

pub mod v20240610preview;
pub mod v20251223preview;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::model::{codes, CloudError, CloudErrorBody, ResourceDocument, ResourceId, ResourceType};

pub use v20240610preview::V20240610Preview;
pub use v20251223preview::V20251223Preview;

/// Who may set a field, as seen through one API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldVisibility {
    /// Server-owned; caller values are silently replaced by the stored ones.
    ReadOnly,
    /// Settable on create only.
    ReadCreate,
    ReadCreateUpdate,
}

/// One JSON leaf of an external schema. `*` stands for any map key and
/// `[]` for any array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub path: &'static str,
    pub visibility: FieldVisibility,
}

pub(crate) const fn ro(path: &'static str) -> FieldRule {
    FieldRule {
        path,
        visibility: FieldVisibility::ReadOnly,
    }
}

pub(crate) const fn rc(path: &'static str) -> FieldRule {
    FieldRule {
        path,
        visibility: FieldVisibility::ReadCreate,
    }
}

pub(crate) const fn rcu(path: &'static str) -> FieldRule {
    FieldRule {
        path,
        visibility: FieldVisibility::ReadCreateUpdate,
    }
}

/// What happens to user-assigned identities that exist in the stored
/// document but are missing from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMergeRule {
    Preserve,
    Prune,
}

/// External representation of one resource type in one API version.
pub trait ExternalResource: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    const RESOURCE_TYPE: ResourceType;

    /// Total mapping; fields this version does not know are left out.
    fn from_internal(doc: &ResourceDocument) -> Self;

    /// Write every exposed field onto `base`. Exposed fields the caller left
    /// out take their canonical default; fields this version does not
    /// expose keep whatever `base` holds.
    fn into_internal(self, base: ResourceDocument) -> ResourceDocument;

    /// Replace every read-only field with the value from `prior`.
    fn copy_read_only_fields(&mut self, prior: &Self, identity_rule: IdentityMergeRule);

    fn field_inventory() -> &'static [FieldRule];
}

/// Compile-time description of an API version.
pub trait VersionSchema: Send + Sync + 'static {
    const NAME: &'static str;
    const IDENTITY_RULES: &'static [(ResourceType, IdentityMergeRule)];

    type Cluster: ExternalResource;
    type NodePool: ExternalResource;
    type ExternalAuth: ExternalResource;
}

/// Runtime interface over an API version, working on JSON payloads.
pub trait ApiVersion: Send + Sync {
    fn name(&self) -> &'static str;

    /// Strictly parse `payload` and map it onto `base`, or onto a default
    /// document for `id` when there is no base.
    fn decode(
        &self,
        id: &ResourceId,
        resource_type: ResourceType,
        payload: &Value,
        base: Option<ResourceDocument>,
    ) -> Result<ResourceDocument, CloudError>;

    fn encode(&self, doc: &ResourceDocument) -> Value;

    /// `incoming` with every read-only field taken from `prior`.
    fn copy_read_only_fields(
        &self,
        resource_type: ResourceType,
        prior: Option<&Value>,
        incoming: &Value,
    ) -> Result<Value, CloudError>;

    fn identity_rule(&self, resource_type: ResourceType) -> IdentityMergeRule;

    fn field_inventory(&self, resource_type: ResourceType) -> &'static [FieldRule];
}

/// Adapter from a [`VersionSchema`] to the object-safe [`ApiVersion`].
pub struct Versioned<V>(PhantomData<V>);

impl<V> Default for Versioned<V> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<V: VersionSchema> ApiVersion for Versioned<V> {
    fn name(&self) -> &'static str {
        V::NAME
    }

    fn decode(
        &self,
        id: &ResourceId,
        resource_type: ResourceType,
        payload: &Value,
        base: Option<ResourceDocument>,
    ) -> Result<ResourceDocument, CloudError> {
        let base = match base {
            Some(base) if base.resource_type() == resource_type => base,
            Some(base) => {
                return Err(CloudError::new(
                    400,
                    codes::INVALID_RESOURCE_TYPE,
                    Some(base.id.to_string()),
                    format!(
                        "Resource '{}' is not of type '{}'",
                        base.id,
                        resource_type.arm_type()
                    ),
                ))
            }
            None => ResourceDocument::new(id.clone(), resource_type),
        };
        match resource_type {
            ResourceType::Cluster => decode_external::<V::Cluster>(payload, base),
            ResourceType::NodePool => decode_external::<V::NodePool>(payload, base),
            ResourceType::ExternalAuth => decode_external::<V::ExternalAuth>(payload, base),
        }
    }

    fn encode(&self, doc: &ResourceDocument) -> Value {
        match doc.resource_type() {
            ResourceType::Cluster => encode_external::<V::Cluster>(doc),
            ResourceType::NodePool => encode_external::<V::NodePool>(doc),
            ResourceType::ExternalAuth => encode_external::<V::ExternalAuth>(doc),
        }
    }

    fn copy_read_only_fields(
        &self,
        resource_type: ResourceType,
        prior: Option<&Value>,
        incoming: &Value,
    ) -> Result<Value, CloudError> {
        let rule = self.identity_rule(resource_type);
        match resource_type {
            ResourceType::Cluster => copy_external::<V::Cluster>(prior, incoming, rule),
            ResourceType::NodePool => copy_external::<V::NodePool>(prior, incoming, rule),
            ResourceType::ExternalAuth => copy_external::<V::ExternalAuth>(prior, incoming, rule),
        }
    }

    fn identity_rule(&self, resource_type: ResourceType) -> IdentityMergeRule {
        V::IDENTITY_RULES
            .iter()
            .find(|(candidate, _)| *candidate == resource_type)
            .map(|(_, rule)| *rule)
            .unwrap_or(IdentityMergeRule::Prune)
    }

    fn field_inventory(&self, resource_type: ResourceType) -> &'static [FieldRule] {
        match resource_type {
            ResourceType::Cluster => V::Cluster::field_inventory(),
            ResourceType::NodePool => V::NodePool::field_inventory(),
            ResourceType::ExternalAuth => V::ExternalAuth::field_inventory(),
        }
    }
}

fn parse<E: ExternalResource>(payload: &Value) -> Result<E, CloudError> {
    E::deserialize(payload).map_err(|err| {
        CloudError::invalid_request_content(format!("Invalid request content: {err}"))
    })
}

fn decode_external<E: ExternalResource>(
    payload: &Value,
    base: ResourceDocument,
) -> Result<ResourceDocument, CloudError> {
    Ok(parse::<E>(payload)?.into_internal(base))
}

fn encode_external<E: ExternalResource>(doc: &ResourceDocument) -> Value {
    serde_json::to_value(E::from_internal(doc)).unwrap_or_else(|err| {
        log::error!("failed to encode {}: {err}", doc.id);
        Value::Null
    })
}

fn copy_external<E: ExternalResource>(
    prior: Option<&Value>,
    incoming: &Value,
    rule: IdentityMergeRule,
) -> Result<Value, CloudError> {
    let mut incoming = parse::<E>(incoming)?;
    let prior = match prior {
        Some(prior) => parse::<E>(prior)?,
        None => E::default(),
    };
    incoming.copy_read_only_fields(&prior, rule);
    serde_json::to_value(incoming).map_err(|err| {
        CloudError::invalid_request_content(format!("Invalid request content: {err}"))
    })
}

/// Read-only merge of an optional nested struct.
///
/// `copy` receives the incoming struct and the prior one; a side that is
/// absent is treated as all-default, so read-only values missing from the
/// prior come out absent.
pub(crate) fn merge_nested<T: Default>(
    incoming: &mut Option<T>,
    prior: Option<&T>,
    copy: impl FnOnce(&mut T, &T),
) {
    match (incoming.as_mut(), prior) {
        (Some(current), Some(prior)) => copy(current, prior),
        (Some(current), None) => copy(current, &T::default()),
        (None, Some(prior)) => {
            let mut fresh = T::default();
            copy(&mut fresh, prior);
            *incoming = Some(fresh);
        }
        (None, None) => {}
    }
}

/// Case-insensitive lookup of an ARM resource id keyed map.
pub(crate) fn find_key<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> Option<&'a V> {
    map.iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Registry of supported API versions keyed by `api-version` string.
#[derive(Clone)]
pub struct ApiVersions {
    versions: BTreeMap<&'static str, Arc<dyn ApiVersion>>,
}

impl ApiVersions {
    pub fn empty() -> Self {
        Self {
            versions: BTreeMap::new(),
        }
    }

    pub fn register<V: VersionSchema>(&mut self) {
        self.versions
            .insert(V::NAME, Arc::new(Versioned::<V>::default()));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ApiVersion>> {
        self.versions.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.versions.keys().copied()
    }
}

impl Default for ApiVersions {
    fn default() -> Self {
        let mut versions = Self::empty();
        versions.register::<V20240610Preview>();
        versions.register::<V20251223Preview>();
        versions
    }
}

/// RFC 7396 JSON merge patch.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Smallest JSON subtree owning a rule: the path up to its first map or
/// array wildcard.
fn container_path(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in path.split('.') {
        if segment == "*" {
            break;
        }
        if let Some(array) = segment.strip_suffix("[]") {
            segments.push(array);
            break;
        }
        segments.push(segment);
    }
    segments
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let found = path
        .iter()
        .try_fold(value, |current, segment| current.get(*segment))?;
    (!found.is_null()).then_some(found)
}

fn insert(value: &mut Value, path: &[&str], leaf: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = value;
    for segment in parents {
        if !current.get(*segment).is_some_and(Value::is_object) {
            if let Value::Object(map) = current {
                map.insert(segment.to_string(), Value::Object(serde_json::Map::new()));
            }
        }
        match current.get_mut(*segment) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), leaf);
    }
}

/// Apply create-only semantics to an update payload.
///
/// Create-only fields the caller left out keep their stored value; fields
/// the caller changed are reported.
pub fn enforce_create_only(
    inventory: &[FieldRule],
    prior: &Value,
    incoming: &mut Value,
) -> Vec<CloudErrorBody> {
    let mut containers: Vec<Vec<&str>> = inventory
        .iter()
        .filter(|rule| rule.visibility == FieldVisibility::ReadCreate)
        .map(|rule| container_path(rule.path))
        .collect();
    containers.sort();
    containers.dedup();

    let mut violations = Vec::new();
    for path in containers {
        let Some(stored) = lookup(prior, &path) else {
            continue;
        };
        match lookup(incoming, &path) {
            None => insert(incoming, &path, stored.clone()),
            Some(requested) if requested != stored => {
                let joined = path.join(".");
                violations.push(
                    CloudErrorBody::new(
                        codes::INVALID_REQUEST_CONTENT,
                        format!("Field '{joined}' cannot be changed after the resource is created"),
                    )
                    .with_target(joined),
                );
            }
            Some(_) => {}
        }
    }
    violations
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    pub fn cluster_id() -> ResourceId {
        ResourceId::provider_resource("sub", "rg", "hcpOpenShiftClusters", "dev")
    }

    /// Cluster with every field set to a non-default value.
    pub fn full_cluster() -> ResourceDocument {
        let mut doc = ResourceDocument::new(cluster_id(), ResourceType::Cluster);
        doc.location = Some("eastus".into());
        doc.tags.insert("env".into(), "prod".into());
        doc.system_data = Some(SystemData {
            created_by: Some("alice@example.com".into()),
            created_by_type: Some(CreatedByType::User),
            created_at: Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()),
            last_modified_by: Some("bob@example.com".into()),
            last_modified_by_type: Some(CreatedByType::Application),
            last_modified_at: Some(Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap()),
        });
        let mut identity = ManagedServiceIdentity {
            identity_type: ManagedServiceIdentityType::UserAssigned,
            principal_id: Some("principal".into()),
            tenant_id: Some("tenant".into()),
            user_assigned_identities: BTreeMap::new(),
        };
        identity.user_assigned_identities.insert(
            "/ids/cp".into(),
            UserAssignedIdentity {
                client_id: Some("client-cp".into()),
                principal_id: Some("principal-cp".into()),
            },
        );
        doc.identity = Some(identity);
        doc.provisioning_state = ProvisioningState::Succeeded;

        let cluster = doc.as_cluster_mut().unwrap();
        cluster.version.id = "4.18".into();
        cluster.version.channel_group = "fast".into();
        cluster.dns.base_domain = "abcd.example.com".into();
        cluster.dns.base_domain_prefix = "dev".into();
        cluster.network.network_type = NetworkType::Other;
        cluster.network.pod_cidr = "10.132.0.0/14".into();
        cluster.network.service_cidr = "172.31.0.0/16".into();
        cluster.network.machine_cidr = "10.1.0.0/16".into();
        cluster.network.host_prefix = 24;
        cluster.console.url = "https://console.example.com".into();
        cluster.api.url = "https://api.example.com".into();
        cluster.api.visibility = Visibility::Private;
        cluster.api.authorized_cidrs = vec!["10.0.0.0/8".into()];
        cluster.platform.managed_resource_group = "managed-rg".into();
        cluster.platform.subnet_id = "/subnets/a".into();
        cluster.platform.network_security_group_id = "/nsgs/a".into();
        cluster.platform.issuer_url = "https://issuer.example.com".into();
        let identities = &mut cluster.platform.operators_authentication.user_assigned_identities;
        identities
            .control_plane_operators
            .insert("ingress".into(), "/ids/cp".into());
        identities
            .data_plane_operators
            .insert("disk".into(), "/ids/dp".into());
        identities.service_managed_identity = "/ids/smi".into();
        cluster.autoscaling.max_nodes_total = 50;
        cluster.autoscaling.max_pod_grace_period_seconds = 300;
        cluster.autoscaling.max_node_provision_time_seconds = 600;
        cluster.autoscaling.pod_priority_threshold = -5;
        cluster.node_drain_timeout_minutes = 30;
        cluster.cluster_service_id = Some("cs-123".into());
        doc
    }

    pub fn full_node_pool() -> ResourceDocument {
        let mut doc = ResourceDocument::new(
            cluster_id().child("nodePools", "workers"),
            ResourceType::NodePool,
        );
        doc.location = Some("eastus".into());
        doc.tags.insert("team".into(), "infra".into());
        doc.system_data = full_cluster().system_data;
        doc.provisioning_state = ProvisioningState::Updating;

        let pool = doc.as_node_pool_mut().unwrap();
        pool.version.id = "4.18.1".into();
        pool.version.channel_group = "fast".into();
        pool.platform.subnet_id = "/subnets/b".into();
        pool.platform.vm_size = "Standard_D8s_v3".into();
        pool.platform.enable_encryption_at_host = true;
        pool.platform.os_disk.size_gib = 128;
        pool.platform.os_disk.disk_storage_account_type = DiskStorageAccountType::StandardSsdLrs;
        pool.platform.os_disk.encryption_set_id = "/des/a".into();
        pool.platform.availability_zone = "2".into();
        pool.replicas = 0;
        pool.auto_repair = false;
        pool.auto_scaling = Some(NodePoolAutoScaling { min: 1, max: 5 });
        pool.labels.insert("role".into(), "worker".into());
        pool.taints.push(Taint {
            effect: Effect::NoExecute,
            key: "dedicated".into(),
            value: "gpu".into(),
        });
        pool.node_drain_timeout_minutes = 15;
        pool.cluster_service_id = Some("np-1".into());
        doc
    }

    pub fn full_external_auth() -> ResourceDocument {
        let mut doc = ResourceDocument::new(
            cluster_id().child("externalAuths", "entra"),
            ResourceType::ExternalAuth,
        );
        doc.system_data = full_cluster().system_data;
        doc.provisioning_state = ProvisioningState::Succeeded;

        let auth = doc.as_external_auth_mut().unwrap();
        auth.condition = Some(ExternalAuthCondition {
            condition_type: "Available".into(),
            status: "True".into(),
            last_transition_time: Some(Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap()),
            reason: "Ready".into(),
            message: "configured".into(),
        });
        auth.issuer.url = "https://login.example.com/v2.0".into();
        auth.issuer.audiences = vec!["api://hcp".into()];
        auth.clients.push(ExternalAuthClient {
            client_id: "console".into(),
            extra_scopes: vec!["email".into()],
            client_type: ExternalAuthClientType::Confidential,
        });
        auth.claim.username_claim = "email".into();
        auth.claim.groups_claim = "groups".into();
        doc
    }

    /// Every leaf path of `value`, with map keys and array indices
    /// generalised the way field inventories write them.
    pub fn leaf_paths(value: &Value, inventory: &[FieldRule]) -> BTreeSet<String> {
        fn walk(value: &Value, path: String, inventory: &[FieldRule], out: &mut BTreeSet<String>) {
            match value {
                Value::Object(map) => {
                    let wildcard = format!("{path}.*");
                    let nested = format!("{wildcard}.");
                    let is_map = inventory
                        .iter()
                        .any(|rule| rule.path == wildcard || rule.path.starts_with(&nested));
                    for (key, child) in map {
                        let segment = if is_map { "*" } else { key.as_str() };
                        let next = if path.is_empty() {
                            segment.to_string()
                        } else {
                            format!("{path}.{segment}")
                        };
                        walk(child, next, inventory, out);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        walk(item, format!("{path}[]"), inventory, out);
                    }
                }
                Value::Null => {}
                _ => {
                    out.insert(path);
                }
            }
        }
        let mut out = BTreeSet::new();
        walk(value, String::new(), inventory, &mut out);
        out
    }

    pub fn inventory_paths(inventory: &[FieldRule]) -> BTreeSet<String> {
        inventory.iter().map(|rule| rule.path.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_patch_follows_rfc7396() {
        let mut target = json!({"a": "b", "c": {"d": "e", "f": "g"}});
        merge_patch(&mut target, &json!({"a": "z", "c": {"f": null}}));
        assert_eq!(target, json!({"a": "z", "c": {"d": "e"}}));

        let mut target = json!({"tags": {"x": "1"}});
        merge_patch(&mut target, &json!({"tags": ["not", "an", "object"]}));
        assert_eq!(target, json!({"tags": ["not", "an", "object"]}));
    }

    #[test]
    fn container_paths_stop_at_wildcards() {
        assert_eq!(
            container_path("properties.network.podCidr"),
            vec!["properties", "network", "podCidr"]
        );
        assert_eq!(container_path("tags.*"), vec!["tags"]);
        assert_eq!(container_path("properties.clients[].clientId"), vec!["properties", "clients"]);
    }

    #[test]
    fn create_only_fields_are_retained_or_rejected() {
        let inventory = [rc("properties.network.podCidr"), rc("location"), rcu("tags.*")];
        let prior = json!({
            "location": "eastus",
            "properties": {"network": {"podCidr": "10.0.0.0/14"}}
        });

        let mut omitted = json!({"tags": {"a": "b"}});
        assert!(enforce_create_only(&inventory, &prior, &mut omitted).is_empty());
        assert_eq!(omitted["properties"]["network"]["podCidr"], "10.0.0.0/14");
        assert_eq!(omitted["location"], "eastus");

        let mut changed = json!({"location": "westus"});
        let violations = enforce_create_only(&inventory, &prior, &mut changed);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].target.as_deref(), Some("location"));
    }

    #[test]
    fn registry_knows_both_versions() {
        let versions = ApiVersions::default();
        assert_eq!(
            versions.names().collect::<Vec<_>>(),
            vec!["2024-06-10-preview", "2025-12-23-preview"]
        );
        assert!(versions.get("2023-01-01").is_none());
    }

    #[test]
    fn identity_rule_tables_are_explicit_per_version() {
        let versions = ApiVersions::default();
        let older = versions.get("2024-06-10-preview").unwrap();
        let newer = versions.get("2025-12-23-preview").unwrap();
        assert_eq!(older.identity_rule(ResourceType::Cluster), IdentityMergeRule::Preserve);
        assert_eq!(newer.identity_rule(ResourceType::Cluster), IdentityMergeRule::Prune);
    }

    #[test]
    fn decode_rejects_base_of_another_type() {
        let versions = ApiVersions::default();
        let version = versions.get("2024-06-10-preview").unwrap();
        let pool = test_support::full_node_pool();
        let err = version
            .decode(&pool.id, ResourceType::Cluster, &json!({}), Some(pool.clone()))
            .unwrap_err();
        assert_eq!(err.error.code, codes::INVALID_RESOURCE_TYPE);
    }
}
