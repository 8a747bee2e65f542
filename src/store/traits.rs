use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StoreError;
use crate::model::ETag;
use crate::store::iterator::DocumentIterator;

/// Sub-namespaces sharing a subscription partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    Resource,
    Operation,
    OperationSlot,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Operation => "operation",
            Self::OperationSlot => "operationSlot",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "resource" => Some(Self::Resource),
            "operation" => Some(Self::Operation),
            "operationSlot" => Some(Self::OperationSlot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    pub partition_key: String,
    pub id: String,
}

impl DocumentKey {
    pub fn new(partition_key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            id: id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.partition_key.is_empty() || self.id.is_empty() {
            return Err(StoreError::InvalidKey(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.id)
    }
}

/// Untyped stored document. `resource_path` is the lowercased resource id
/// the document belongs to and drives scoped listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub key: DocumentKey,
    pub kind: DocumentKind,
    pub resource_path: String,
    pub etag: Option<ETag>,
    pub body: serde_json::Value,
}

/// Conditional-write guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    None,
    /// Write only if the stored token still equals this one.
    IfMatch(ETag),
    /// Write only if no document exists under the key.
    IfNoneMatch,
}

impl Precondition {
    pub fn from_etag(etag: Option<&ETag>) -> Self {
        match etag {
            Some(etag) => Self::IfMatch(etag.clone()),
            None => Self::IfNoneMatch,
        }
    }
}

/// One page of a listing. `continuation` is `None` on the last page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub documents: Vec<RawDocument>,
    pub continuation: Option<String>,
}

/// Backend query that can be read one page at a time.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        continuation: Option<&str>,
        limit: usize,
    ) -> Result<Page, StoreError>;
}

/// Minimal document store contract. Implementations never retry; transient
/// failures surface as [`StoreError::Retryable`].
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, key: &DocumentKey) -> Result<RawDocument, StoreError>;

    /// Store `doc`, returning it with the newly issued concurrency token.
    async fn write(
        &self,
        doc: RawDocument,
        precondition: Precondition,
    ) -> Result<RawDocument, StoreError>;

    async fn remove(&self, key: &DocumentKey, precondition: Precondition) -> Result<(), StoreError>;

    /// Lazily list documents of one kind in a partition, ordered by id.
    /// With a `scope`, only documents whose resource path is the scope or
    /// nested beneath it are returned.
    fn query(
        &self,
        partition_key: &str,
        kind: DocumentKind,
        scope: Option<&str>,
    ) -> DocumentIterator<RawDocument>;
}

/// Everything the frontend needs from persistence.
pub trait Store: DocumentStore + 'static {}
impl<T: DocumentStore + 'static> Store for T {}

/// Segment-aware scope match on lowercased resource paths.
pub fn in_scope(resource_path: &str, scope: &str) -> bool {
    resource_path == scope
        || (resource_path.starts_with(scope) && resource_path[scope.len()..].starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_match_stops_at_segment_boundary() {
        assert!(in_scope("/subscriptions/s/x/a", "/subscriptions/s/x/a"));
        assert!(in_scope("/subscriptions/s/x/a/nodepools/b", "/subscriptions/s/x/a"));
        assert!(!in_scope("/subscriptions/s/x/ab", "/subscriptions/s/x/a"));
    }

    #[test]
    fn empty_keys_are_rejected() {
        assert!(DocumentKey::new("", "id").validate().is_err());
        assert!(DocumentKey::new("p", "id").validate().is_ok());
    }
}
