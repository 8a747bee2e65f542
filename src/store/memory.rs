use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::StoreError;
use crate::model::ETag;
use crate::store::iterator::DocumentIterator;
use crate::store::traits::{
    in_scope, DocumentKey, DocumentKind, DocumentStore, Page, PageSource, Precondition, RawDocument,
};

type Documents = BTreeMap<DocumentKey, RawDocument>;

/// In-process document store.
///
/// Each conditional write checks and mutates under one write lock, so the
/// precondition check and the write are atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<Documents>>,
    /// Number of upcoming calls that fail with a transient error.
    injected_failures: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` store calls fail with [`StoreError::Retryable`].
    pub fn fail_next(&self, count: usize) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

fn injected_failure(counter: &AtomicUsize) -> Result<(), StoreError> {
    let previous = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    match previous {
        Ok(_) => Err(StoreError::Retryable("injected transient failure".to_string())),
        Err(_) => Ok(()),
    }
}

fn check_precondition(
    key: &DocumentKey,
    current: Option<&RawDocument>,
    precondition: &Precondition,
) -> Result<(), StoreError> {
    match (precondition, current) {
        (Precondition::None, _) => Ok(()),
        (Precondition::IfNoneMatch, None) => Ok(()),
        (Precondition::IfNoneMatch, Some(_)) => Err(StoreError::Conflict(key.to_string())),
        (Precondition::IfMatch(expected), Some(doc)) if doc.etag.as_ref() == Some(expected) => {
            Ok(())
        }
        (Precondition::IfMatch(_), _) => Err(StoreError::Conflict(key.to_string())),
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, key: &DocumentKey) -> Result<RawDocument, StoreError> {
        key.validate()?;
        injected_failure(&self.injected_failures)?;
        self.documents
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn write(
        &self,
        mut doc: RawDocument,
        precondition: Precondition,
    ) -> Result<RawDocument, StoreError> {
        doc.key.validate()?;
        injected_failure(&self.injected_failures)?;
        let mut documents = self.documents.write();
        check_precondition(&doc.key, documents.get(&doc.key), &precondition)?;
        doc.etag = Some(ETag::generate());
        documents.insert(doc.key.clone(), doc.clone());
        Ok(doc)
    }

    async fn remove(
        &self,
        key: &DocumentKey,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        key.validate()?;
        injected_failure(&self.injected_failures)?;
        let mut documents = self.documents.write();
        if !documents.contains_key(key) && precondition == Precondition::None {
            return Err(StoreError::NotFound(key.to_string()));
        }
        check_precondition(key, documents.get(key), &precondition)?;
        documents.remove(key);
        Ok(())
    }

    fn query(
        &self,
        partition_key: &str,
        kind: DocumentKind,
        scope: Option<&str>,
    ) -> DocumentIterator<RawDocument> {
        DocumentIterator::new(Arc::new(MemoryQuery {
            documents: self.documents.clone(),
            injected_failures: self.injected_failures.clone(),
            partition_key: partition_key.to_string(),
            kind,
            scope: scope.map(str::to_string),
        }))
    }
}

struct MemoryQuery {
    documents: Arc<RwLock<Documents>>,
    injected_failures: Arc<AtomicUsize>,
    partition_key: String,
    kind: DocumentKind,
    scope: Option<String>,
}

#[async_trait::async_trait]
impl PageSource for MemoryQuery {
    async fn fetch_page(
        &self,
        continuation: Option<&str>,
        limit: usize,
    ) -> Result<Page, StoreError> {
        injected_failure(&self.injected_failures)?;
        let documents = self.documents.read();
        let start = DocumentKey::new(self.partition_key.clone(), continuation.unwrap_or_default());

        let mut matching = documents
            .range(start..)
            .take_while(|(key, _)| key.partition_key == self.partition_key)
            .filter(|(key, _)| continuation.map_or(true, |after| key.id.as_str() > after))
            .map(|(_, doc)| doc)
            .filter(|doc| doc.kind == self.kind)
            .filter(|doc| {
                self.scope
                    .as_deref()
                    .map_or(true, |scope| in_scope(&doc.resource_path, scope))
            });

        let page: Vec<RawDocument> = matching.by_ref().take(limit).cloned().collect();
        let continuation = match (matching.next(), page.last()) {
            (Some(_), Some(last)) => Some(last.key.id.clone()),
            _ => None,
        };

        Ok(Page {
            documents: page,
            continuation,
        })
    }
}
