//! Typed accessors over the untyped [`DocumentStore`] contract.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{ETag, Id, OperationDocument, ResourceDocument, ResourceId};
use crate::store::iterator::DocumentIterator;
use crate::store::traits::{DocumentKey, DocumentKind, DocumentStore, Precondition, RawDocument};

pub trait DocumentStoreExt: DocumentStore + Sized {
    fn resources(&self) -> Resources<'_, Self> {
        Resources { store: self }
    }

    /// Operations namespace of one subscription.
    fn operations(&self, subscription_id: &str) -> Operations<'_, Self> {
        Operations {
            store: self,
            partition_key: subscription_id.to_lowercase(),
        }
    }
}

impl<T: DocumentStore> DocumentStoreExt for T {}

pub struct Resources<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> Resources<'a, S> {
    pub async fn get(&self, id: &ResourceId) -> Result<ResourceDocument, StoreError> {
        let raw = self.store.read(&resource_key(id)?).await?;
        decode_resource(raw)
    }

    /// Like [`Resources::get`] but maps a missing document to `None`.
    pub async fn find(&self, id: &ResourceId) -> Result<Option<ResourceDocument>, StoreError> {
        match self.get(id).await {
            Ok(doc) => Ok(Some(doc)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Every resource at or beneath `scope`.
    pub fn list_recursive(&self, scope: &ResourceId) -> DocumentIterator<ResourceDocument> {
        self.store
            .query(
                &scope.partition_key(),
                DocumentKind::Resource,
                Some(&scope.to_lowercase()),
            )
            .decode_with(decode_resource)
    }

    /// Persist `doc`. The returned copy carries the new concurrency token.
    pub async fn create_or_replace(
        &self,
        doc: &ResourceDocument,
        precondition: Precondition,
    ) -> Result<ResourceDocument, StoreError> {
        let key = resource_key(&doc.id)?;
        let body = encode(&key, doc)?;
        let stored = self
            .store
            .write(
                RawDocument {
                    key,
                    kind: DocumentKind::Resource,
                    resource_path: doc.id.to_lowercase(),
                    etag: None,
                    body,
                },
                precondition,
            )
            .await?;
        let mut persisted = doc.clone();
        persisted.etag = stored.etag;
        Ok(persisted)
    }

    pub async fn delete(
        &self,
        id: &ResourceId,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        self.store.remove(&resource_key(id)?, precondition).await
    }
}

/// Marker recording which operation currently owns a resource. At most one
/// slot exists per resource, which is what serializes operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSlot {
    pub target: ResourceId,
    pub operation_id: Id,
    #[serde(skip)]
    pub etag: Option<ETag>,
}

pub struct Operations<'a, S> {
    store: &'a S,
    partition_key: String,
}

impl<'a, S: DocumentStore> Operations<'a, S> {
    fn key(&self, operation_id: &str) -> DocumentKey {
        DocumentKey::new(self.partition_key.clone(), operation_id)
    }

    fn slot_key(&self, target: &ResourceId) -> Result<DocumentKey, StoreError> {
        if target.partition_key() != self.partition_key {
            return Err(StoreError::InvalidKey(format!(
                "{target} is outside subscription partition {}",
                self.partition_key
            )));
        }
        Ok(DocumentKey::new(
            self.partition_key.clone(),
            format!("slot|{}", target.document_id()),
        ))
    }

    pub async fn get(&self, operation_id: &str) -> Result<OperationDocument, StoreError> {
        let raw = self.store.read(&self.key(operation_id)).await?;
        decode_operation(raw)
    }

    pub async fn create(
        &self,
        operation: &OperationDocument,
    ) -> Result<OperationDocument, StoreError> {
        self.put(operation, Precondition::IfNoneMatch).await
    }

    /// Conditional replace against the operation's own token.
    pub async fn replace(
        &self,
        operation: &OperationDocument,
    ) -> Result<OperationDocument, StoreError> {
        let precondition = Precondition::from_etag(operation.etag.as_ref());
        self.put(operation, precondition).await
    }

    async fn put(
        &self,
        operation: &OperationDocument,
        precondition: Precondition,
    ) -> Result<OperationDocument, StoreError> {
        let key = self.key(&operation.id);
        if operation.target.partition_key() != self.partition_key {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let body = encode(&key, operation)?;
        let stored = self
            .store
            .write(
                RawDocument {
                    key,
                    kind: DocumentKind::Operation,
                    resource_path: operation.target.to_lowercase(),
                    etag: None,
                    body,
                },
                precondition,
            )
            .await?;
        let mut persisted = operation.clone();
        persisted.etag = stored.etag;
        Ok(persisted)
    }

    pub async fn delete(
        &self,
        operation_id: &str,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        self.store.remove(&self.key(operation_id), precondition).await
    }

    /// All operations of the subscription in start-time order.
    pub fn list(&self) -> DocumentIterator<OperationDocument> {
        self.store
            .query(&self.partition_key, DocumentKind::Operation, None)
            .decode_with(decode_operation)
    }

    /// Operations targeting `scope` or anything nested beneath it.
    pub fn list_for_target(&self, scope: &ResourceId) -> DocumentIterator<OperationDocument> {
        self.store
            .query(
                &self.partition_key,
                DocumentKind::Operation,
                Some(&scope.to_lowercase()),
            )
            .decode_with(decode_operation)
    }

    /// Create the slot for `target`; conflicts if any slot already exists.
    pub async fn claim_slot(
        &self,
        target: &ResourceId,
        operation_id: &str,
    ) -> Result<OperationSlot, StoreError> {
        let slot = OperationSlot {
            target: target.clone(),
            operation_id: operation_id.to_string(),
            etag: None,
        };
        self.put_slot(&slot, Precondition::IfNoneMatch).await
    }

    pub async fn read_slot(
        &self,
        target: &ResourceId,
    ) -> Result<Option<OperationSlot>, StoreError> {
        let key = self.slot_key(target)?;
        match self.store.read(&key).await {
            Ok(raw) => {
                let mut slot: OperationSlot = serde_json::from_value(raw.body).map_err(|source| {
                    StoreError::Malformed {
                        key: key.to_string(),
                        source,
                    }
                })?;
                slot.etag = raw.etag;
                Ok(Some(slot))
            }
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Point an existing slot at a new operation, guarded by the slot's token.
    pub async fn takeover_slot(
        &self,
        slot: &OperationSlot,
        operation_id: &str,
    ) -> Result<OperationSlot, StoreError> {
        let next = OperationSlot {
            target: slot.target.clone(),
            operation_id: operation_id.to_string(),
            etag: None,
        };
        self.put_slot(&next, Precondition::from_etag(slot.etag.as_ref()))
            .await
    }

    pub async fn release_slot(&self, slot: &OperationSlot) -> Result<(), StoreError> {
        let key = self.slot_key(&slot.target)?;
        self.store
            .remove(&key, Precondition::from_etag(slot.etag.as_ref()))
            .await
    }

    async fn put_slot(
        &self,
        slot: &OperationSlot,
        precondition: Precondition,
    ) -> Result<OperationSlot, StoreError> {
        let key = self.slot_key(&slot.target)?;
        let body = encode(&key, slot)?;
        let stored = self
            .store
            .write(
                RawDocument {
                    key,
                    kind: DocumentKind::OperationSlot,
                    resource_path: slot.target.to_lowercase(),
                    etag: None,
                    body,
                },
                precondition,
            )
            .await?;
        let mut persisted = slot.clone();
        persisted.etag = stored.etag;
        Ok(persisted)
    }
}

fn resource_key(id: &ResourceId) -> Result<DocumentKey, StoreError> {
    if !id.is_resource() {
        return Err(StoreError::InvalidKey(format!("{id} is a scope, not a resource")));
    }
    Ok(DocumentKey::new(id.partition_key(), id.document_id()))
}

fn encode<T: Serialize>(key: &DocumentKey, value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Malformed {
        key: key.to_string(),
        source,
    })
}

fn decode_resource(raw: RawDocument) -> Result<ResourceDocument, StoreError> {
    let key = raw.key.to_string();
    let mut doc: ResourceDocument =
        serde_json::from_value(raw.body).map_err(|source| StoreError::Malformed { key, source })?;
    doc.etag = raw.etag;
    Ok(doc)
}

fn decode_operation(raw: RawDocument) -> Result<OperationDocument, StoreError> {
    let key = raw.key.to_string();
    let mut operation: OperationDocument =
        serde_json::from_value(raw.body).map_err(|source| StoreError::Malformed { key, source })?;
    operation.etag = raw.etag;
    Ok(operation)
}
