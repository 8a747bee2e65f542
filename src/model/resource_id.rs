use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const PROVIDER_NAMESPACE: &str = "Microsoft.RedHatOpenShift";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid resource id '{id}': {reason}")]
pub struct ResourceIdError {
    pub id: String,
    pub reason: &'static str,
}

/// Hierarchical ARM resource identifier.
///
/// Covers subscription and resource group scopes as well as provider
/// resources with any depth of nested child types. Comparison ignores case,
/// display keeps the casing the id was built with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    subscription_id: String,
    resource_group: Option<String>,
    namespace: Option<String>,
    /// (type, name) pairs from the outermost resource inwards.
    segments: Vec<(String, String)>,
}

impl ResourceId {
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let err = |reason| ResourceIdError {
            id: id.to_string(),
            reason,
        };

        let trimmed = id
            .strip_prefix('/')
            .ok_or_else(|| err("must start with '/'"))?;
        let parts: Vec<&str> = trimmed.trim_end_matches('/').split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(err("empty path segment"));
        }
        if parts.len() < 2 || !parts[0].eq_ignore_ascii_case("subscriptions") {
            return Err(err("missing subscription segment"));
        }

        let mut resource_id = Self::subscription(parts[1]);
        let mut rest = &parts[2..];
        if rest.is_empty() {
            return Ok(resource_id);
        }

        if rest[0].eq_ignore_ascii_case("resourceGroups") {
            let name = rest.get(1).ok_or_else(|| err("missing resource group name"))?;
            resource_id.resource_group = Some(name.to_string());
            rest = &rest[2..];
            if rest.is_empty() {
                return Ok(resource_id);
            }
        }

        if !rest[0].eq_ignore_ascii_case("providers") || rest.len() < 2 {
            return Err(err("missing provider namespace"));
        }
        resource_id.namespace = Some(rest[1].to_string());
        rest = &rest[2..];
        if rest.len() % 2 != 0 {
            return Err(err("resource type without a name"));
        }
        resource_id.segments = rest
            .chunks(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();

        Ok(resource_id)
    }

    pub fn subscription(subscription_id: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: None,
            namespace: None,
            segments: Vec::new(),
        }
    }

    pub fn resource_group_scope(subscription_id: &str, resource_group: &str) -> Self {
        Self {
            resource_group: Some(resource_group.to_string()),
            ..Self::subscription(subscription_id)
        }
    }

    /// Top-level resource of this provider inside a resource group.
    pub fn provider_resource(
        subscription_id: &str,
        resource_group: &str,
        resource_type: &str,
        name: &str,
    ) -> Self {
        Self {
            namespace: Some(PROVIDER_NAMESPACE.to_string()),
            segments: vec![(resource_type.to_string(), name.to_string())],
            ..Self::resource_group_scope(subscription_id, resource_group)
        }
    }

    pub fn child(&self, resource_type: &str, name: &str) -> Self {
        let mut child = self.clone();
        child
            .segments
            .push((resource_type.to_string(), name.to_string()));
        child
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|(_, name)| name.as_str())
    }

    /// True when the id names a provider resource rather than a scope.
    pub fn is_resource(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Full ARM type, e.g. `Microsoft.RedHatOpenShift/hcpOpenShiftClusters/nodePools`.
    pub fn resource_type(&self) -> Option<String> {
        let namespace = self.namespace.as_ref()?;
        if self.segments.is_empty() {
            return None;
        }
        let mut full = namespace.clone();
        for (resource_type, _) in &self.segments {
            full.push('/');
            full.push_str(resource_type);
        }
        Some(full)
    }

    /// Enclosing provider resource for nested types.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    pub fn partition_key(&self) -> String {
        self.subscription_id.to_lowercase()
    }

    /// Case-folded form used for storage and prefix matching.
    pub fn to_lowercase(&self) -> String {
        self.to_string().to_lowercase()
    }

    /// Store document id: the case-folded path with '/' swapped for '|',
    /// a character ARM does not allow inside resource ids.
    pub fn document_id(&self) -> String {
        self.to_lowercase().replace('/', "|")
    }

    /// Whether `other` is this id or nested anywhere beneath it.
    pub fn contains(&self, other: &ResourceId) -> bool {
        let scope = self.to_lowercase();
        let candidate = other.to_lowercase();
        candidate == scope || candidate.starts_with(&format!("{scope}/"))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(resource_group) = &self.resource_group {
            write!(f, "/resourceGroups/{resource_group}")?;
        }
        if let Some(namespace) = &self.namespace {
            write!(f, "/providers/{namespace}")?;
        }
        for (resource_type, name) in &self.segments {
            write!(f, "/{resource_type}/{name}")?;
        }
        Ok(())
    }
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.to_lowercase() == other.to_lowercase()
    }
}

impl Eq for ResourceId {}

impl std::hash::Hash for ResourceId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_lowercase().hash(state);
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ResourceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(value: ResourceId) -> Self {
        value.to_string()
    }
}

impl std::str::FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_POOL: &str = "/subscriptions/00000000-AAAA-0000-0000-000000000000/resourceGroups/MyRG/providers/Microsoft.RedHatOpenShift/hcpOpenShiftClusters/dev/nodePools/workers";

    #[test]
    fn parses_nested_resource() {
        let id = ResourceId::parse(NODE_POOL).unwrap();
        assert_eq!(id.subscription_id(), "00000000-AAAA-0000-0000-000000000000");
        assert_eq!(id.resource_group(), Some("MyRG"));
        assert_eq!(id.name(), Some("workers"));
        assert_eq!(
            id.resource_type().as_deref(),
            Some("Microsoft.RedHatOpenShift/hcpOpenShiftClusters/nodePools")
        );
        assert_eq!(id.to_string(), NODE_POOL);
    }

    #[test]
    fn parent_strips_last_segment() {
        let id = ResourceId::parse(NODE_POOL).unwrap();
        let parent = id.parent().unwrap();
        assert_eq!(parent.name(), Some("dev"));
        assert!(parent.parent().is_none());
        assert!(parent.contains(&id));
        assert!(!id.contains(&parent));
    }

    #[test]
    fn partition_and_document_keys_are_case_folded() {
        let id = ResourceId::parse(NODE_POOL).unwrap();
        assert_eq!(id.partition_key(), "00000000-aaaa-0000-0000-000000000000");
        assert!(id.document_id().starts_with("|subscriptions|00000000-aaaa"));
        assert!(!id.document_id().contains('/'));
    }

    #[test]
    fn comparison_ignores_case() {
        let upper = ResourceId::parse(NODE_POOL).unwrap();
        let lower = ResourceId::parse(&NODE_POOL.to_lowercase()).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn prefix_match_respects_segment_boundaries() {
        let cluster = ResourceId::provider_resource("sub", "rg", "hcpOpenShiftClusters", "dev");
        let sibling = ResourceId::provider_resource("sub", "rg", "hcpOpenShiftClusters", "dev2");
        assert!(!cluster.contains(&sibling));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(ResourceId::parse("subscriptions/x").is_err());
        assert!(ResourceId::parse("/subscriptions").is_err());
        assert!(ResourceId::parse("/subscriptions/s/resourceGroups/rg/providers/ns/type").is_err());
        assert!(ResourceId::parse("/subscriptions//resourceGroups/rg").is_err());
    }

    #[test]
    fn parses_scopes() {
        let scope = ResourceId::parse("/subscriptions/s/resourceGroups/rg").unwrap();
        assert!(!scope.is_resource());
        assert_eq!(scope.resource_type(), None);
    }
}
