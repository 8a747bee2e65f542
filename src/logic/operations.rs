use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::Arc;

use crate::error::{FrontendError, StoreError};
use crate::logic::retry::{retry_with_backoff, RetryConfig};
use crate::model::{
    CloudErrorBody, OperationDocument, OperationRequest, OperationResult, OperationStatus,
    RequestContext, ResourceId,
};
use crate::store::{DocumentIterator, DocumentStoreExt, OperationSlot, Precondition, Store};

/// Upper bound on re-read rounds after losing a conditional write.
const MAX_CONFLICT_ROUNDS: usize = 8;

/// Outcome of completing an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// This call moved the operation into its terminal state.
    Transitioned(OperationDocument),
    /// The operation was already terminal; the stored copy is returned as is.
    AlreadyTerminal(OperationDocument),
}

impl Completion {
    pub fn operation(&self) -> &OperationDocument {
        match self {
            Self::Transitioned(operation) | Self::AlreadyTerminal(operation) => operation,
        }
    }

    pub fn into_operation(self) -> OperationDocument {
        match self {
            Self::Transitioned(operation) | Self::AlreadyTerminal(operation) => operation,
        }
    }

    pub fn transitioned(&self) -> bool {
        matches!(self, Self::Transitioned(_))
    }
}

/// Lifecycle of asynchronous operations.
///
/// At most one non-terminal operation exists per resource. That is enforced
/// by the resource's operation slot, a document claimed with a conditional
/// create and released when the operation completes.
pub struct OperationTracker<S> {
    store: Arc<S>,
    retry: RetryConfig,
    ttl: Duration,
}

impl<S: Store> OperationTracker<S> {
    pub fn new(store: Arc<S>, retry: RetryConfig, ttl: Duration) -> Self {
        Self { store, retry, ttl }
    }

    async fn retry<T, F, Fut>(&self, name: &str, operation: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        retry_with_backoff(&self.retry, name, operation).await
    }

    /// Record a new operation against `target`.
    ///
    /// Fails with [`FrontendError::OperationInProgress`] carrying the existing
    /// operation when another one is still running on the same resource.
    pub async fn start(
        &self,
        target: &ResourceId,
        request: OperationRequest,
        ctx: &RequestContext,
    ) -> Result<OperationDocument, FrontendError> {
        let sub = target.subscription_id();
        let mut operation = OperationDocument::new(target.clone(), request);
        operation.client_request_id = ctx.client_request_id.clone();
        operation.correlation_request_id = ctx.correlation_request_id.clone();

        // The operation document exists before the slot points at it, so a
        // slot naming a missing operation is always stale.
        let created = {
            let operation = &operation;
            self.retry("create operation", || async move {
                self.store.operations(sub).create(operation).await
            })
            .await?
        };

        match self.claim(target, &created.id).await {
            Ok(()) => {
                log::info!(
                    "started {:?} operation {} for {}",
                    created.request,
                    created.id,
                    target
                );
                Ok(created)
            }
            Err(err) => {
                let id = created.id.as_str();
                let discarded = self
                    .retry("discard operation", || async move {
                        self.store
                            .operations(sub)
                            .delete(id, Precondition::None)
                            .await
                    })
                    .await;
                if let Err(discard_err) = discarded {
                    log::warn!("failed to discard unused operation {id}: {discard_err}");
                }
                Err(err)
            }
        }
    }

    async fn claim(&self, target: &ResourceId, operation_id: &str) -> Result<(), FrontendError> {
        let sub = target.subscription_id();
        for _ in 0..MAX_CONFLICT_ROUNDS {
            let claimed = self
                .retry("claim operation slot", || async move {
                    self.store.operations(sub).claim_slot(target, operation_id).await
                })
                .await;
            match claimed {
                Ok(_) => return Ok(()),
                Err(err) if err.is_conflict() => {}
                Err(err) => return Err(err.into()),
            }

            let slot = self
                .retry("read operation slot", || async move {
                    self.store.operations(sub).read_slot(target).await
                })
                .await?;
            // Released between our claim and the read.
            let Some(slot) = slot else { continue };

            if let Some(existing) = self.find(sub, &slot.operation_id).await? {
                if !existing.status.is_terminal() {
                    return Err(FrontendError::OperationInProgress(Box::new(existing)));
                }
            }

            let slot = &slot;
            let taken = self
                .retry("take over operation slot", || async move {
                    self.store
                        .operations(sub)
                        .takeover_slot(slot, operation_id)
                        .await
                })
                .await;
            match taken {
                Ok(_) => {
                    log::debug!(
                        "took over stale operation slot of {} from {}",
                        target,
                        slot.operation_id
                    );
                    return Ok(());
                }
                Err(err) if err.is_conflict() => {}
                Err(err) => return Err(err.into()),
            }
        }
        Err(FrontendError::Conflict {
            target: target.to_string(),
            message: "Could not acquire the operation slot for this resource. Retry the request."
                .to_string(),
        })
    }

    async fn find(
        &self,
        sub: &str,
        operation_id: &str,
    ) -> Result<Option<OperationDocument>, FrontendError> {
        let found = self
            .retry("read operation", || async move {
                self.store.operations(sub).get(operation_id).await
            })
            .await;
        match found {
            Ok(operation) => Ok(Some(operation)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get(
        &self,
        sub: &str,
        operation_id: &str,
    ) -> Result<OperationDocument, FrontendError> {
        self.find(sub, operation_id)
            .await?
            .ok_or_else(|| FrontendError::OperationNotFound(operation_id.to_string()))
    }

    /// The non-terminal operation currently holding `target`'s slot.
    pub async fn active_for(
        &self,
        target: &ResourceId,
    ) -> Result<Option<OperationDocument>, FrontendError> {
        let sub = target.subscription_id();
        let slot = self
            .retry("read operation slot", || async move {
                self.store.operations(sub).read_slot(target).await
            })
            .await?;
        let Some(slot) = slot else {
            return Ok(None);
        };
        Ok(self
            .find(sub, &slot.operation_id)
            .await?
            .filter(|operation| !operation.status.is_terminal()))
    }

    /// `Pending -> Running`. Running operations are returned unchanged.
    pub async fn mark_running(
        &self,
        sub: &str,
        operation_id: &str,
    ) -> Result<OperationDocument, FrontendError> {
        for _ in 0..MAX_CONFLICT_ROUNDS {
            let current = self.get(sub, operation_id).await?;
            match current.status {
                OperationStatus::Running => return Ok(current),
                status if status.is_terminal() => {
                    return Err(FrontendError::Conflict {
                        target: current.target.to_string(),
                        message: format!("Operation {operation_id} has already completed"),
                    })
                }
                _ => {}
            }

            let mut next = current;
            next.status = OperationStatus::Running;
            next.last_transition_time = Utc::now();
            match self.replace(sub, &next).await {
                Ok(stored) => return Ok(stored),
                Err(err) if err.is_conflict() => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(self.contention(operation_id))
    }

    /// Move an operation to its terminal state exactly once.
    pub async fn complete(
        &self,
        sub: &str,
        operation_id: &str,
        result: OperationResult,
    ) -> Result<Completion, FrontendError> {
        for _ in 0..MAX_CONFLICT_ROUNDS {
            let current = self.get(sub, operation_id).await?;
            if current.status.is_terminal() {
                log::debug!(
                    "operation {operation_id} already {:?}; ignoring {:?}",
                    current.status,
                    result.status()
                );
                return Ok(Completion::AlreadyTerminal(current));
            }

            let mut next = current;
            next.status = result.status();
            next.error = result.clone().into_error();
            next.last_transition_time = Utc::now();
            match self.replace(sub, &next).await {
                Ok(stored) => {
                    self.release(&stored).await;
                    log_transition(&stored);
                    return Ok(Completion::Transitioned(stored));
                }
                Err(err) if err.is_conflict() => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(self.contention(operation_id))
    }

    pub async fn cancel(
        &self,
        sub: &str,
        operation_id: &str,
        reason: CloudErrorBody,
    ) -> Result<Completion, FrontendError> {
        self.complete(sub, operation_id, OperationResult::Canceled(reason))
            .await
    }

    /// Operations of a subscription in start-time order, optionally limited
    /// to those targeting `scope` or anything beneath it.
    pub fn list_for_subscription(
        &self,
        sub: &str,
        scope: Option<&ResourceId>,
    ) -> DocumentIterator<OperationDocument> {
        let operations = self.store.operations(sub);
        match scope {
            Some(scope) => operations.list_for_target(scope),
            None => operations.list(),
        }
    }

    /// Delete terminal operations whose last transition is older than the
    /// retention window. Returns how many were removed.
    pub async fn prune_expired(
        &self,
        sub: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, FrontendError> {
        let cutoff = now - self.ttl;
        let mut expired = Vec::new();
        let mut operations = self.list_for_subscription(sub, None);
        while let Some(operation) = operations.next().await {
            if operation.status.is_terminal() && operation.last_transition_time < cutoff {
                expired.push(operation);
            }
        }
        if let Some(err) = operations.take_error() {
            return Err(err.into());
        }

        let mut removed = 0;
        for operation in &expired {
            let deleted = self
                .retry("prune operation", || async move {
                    self.store
                        .operations(sub)
                        .delete(&operation.id, Precondition::from_etag(operation.etag.as_ref()))
                        .await
                })
                .await;
            match deleted {
                Ok(()) => removed += 1,
                Err(err) if err.is_conflict() || err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
        }
        if removed > 0 {
            log::info!("pruned {removed} expired operations in subscription {sub}");
        }
        Ok(removed)
    }

    async fn replace(
        &self,
        sub: &str,
        operation: &OperationDocument,
    ) -> Result<OperationDocument, StoreError> {
        self.retry("update operation", || async move {
            self.store.operations(sub).replace(operation).await
        })
        .await
    }

    /// Drop the slot if it still names `operation`. Losing the race to a
    /// newer operation is fine; a leftover slot is treated as stale anyway.
    async fn release(&self, operation: &OperationDocument) {
        let sub = operation.subscription_id.as_str();
        let target = &operation.target;
        let slot: Result<Option<OperationSlot>, StoreError> = self
            .retry("read operation slot", || async move {
                self.store.operations(sub).read_slot(target).await
            })
            .await;
        let slot = match slot {
            Ok(Some(slot)) if slot.operation_id == operation.id => slot,
            Ok(_) => return,
            Err(err) => {
                log::warn!("could not read operation slot of {target}: {err}");
                return;
            }
        };
        let slot = &slot;
        let released = self
            .retry("release operation slot", || async move {
                self.store.operations(sub).release_slot(slot).await
            })
            .await;
        if let Err(err) = released {
            if !err.is_conflict() && !err.is_not_found() {
                log::warn!("could not release operation slot of {target}: {err}");
            }
        }
    }

    fn contention(&self, operation_id: &str) -> FrontendError {
        FrontendError::Conflict {
            target: operation_id.to_string(),
            message: "The operation is being modified concurrently. Retry the request.".to_string(),
        }
    }
}

fn log_transition(operation: &OperationDocument) {
    match &operation.error {
        Some(error) if operation.status == OperationStatus::Failed => log::error!(
            "{}: {} (operation {}, {}: {})",
            operation.transition_message(),
            operation.target,
            operation.id,
            error.code,
            error.message
        ),
        _ => log::info!(
            "{}: {} (operation {})",
            operation.transition_message(),
            operation.target,
            operation.id
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::codes;
    use crate::store::MemoryStore;

    fn target(name: &str) -> ResourceId {
        ResourceId::provider_resource("sub-1", "rg", "hcpOpenShiftClusters", name)
    }

    fn tracker(store: &MemoryStore) -> OperationTracker<MemoryStore> {
        OperationTracker::new(
            Arc::new(store.clone()),
            RetryConfig::immediate(4),
            Duration::hours(24),
        )
    }

    #[tokio::test]
    async fn start_rejects_second_operation_on_same_resource() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        let ctx = RequestContext::with_ids(Some("client-1".into()), None);

        let first = tracker
            .start(&target("dev"), OperationRequest::Create, &ctx)
            .await
            .unwrap();
        assert_eq!(first.status, OperationStatus::Pending);
        assert_eq!(first.client_request_id.as_deref(), Some("client-1"));

        match tracker
            .start(&target("dev"), OperationRequest::Update, &ctx)
            .await
        {
            Err(FrontendError::OperationInProgress(existing)) => assert_eq!(existing.id, first.id),
            other => panic!("expected OperationInProgress, got {other:?}"),
        }

        // The rejected attempt leaves no operation behind.
        let all = tracker
            .list_for_subscription("sub-1", None)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        tracker
            .start(&target("other"), OperationRequest::Create, &ctx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn completion_frees_the_resource() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        let ctx = RequestContext::default();

        let first = tracker
            .start(&target("dev"), OperationRequest::Create, &ctx)
            .await
            .unwrap();
        tracker
            .complete("sub-1", &first.id, OperationResult::Succeeded)
            .await
            .unwrap();
        assert!(tracker.active_for(&target("dev")).await.unwrap().is_none());

        let second = tracker
            .start(&target("dev"), OperationRequest::Update, &ctx)
            .await
            .unwrap();
        assert!(second.id > first.id);
        assert_eq!(
            tracker.active_for(&target("dev")).await.unwrap().unwrap().id,
            second.id
        );
    }

    #[tokio::test]
    async fn stale_slot_is_taken_over() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        store
            .operations("sub-1")
            .claim_slot(&target("dev"), "vanished")
            .await
            .unwrap();

        let operation = tracker
            .start(&target("dev"), OperationRequest::Create, &RequestContext::default())
            .await
            .unwrap();
        let slot = store
            .operations("sub-1")
            .read_slot(&target("dev"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(slot.operation_id, operation.id);
    }

    #[tokio::test]
    async fn completion_happens_exactly_once() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        let operation = tracker
            .start(&target("dev"), OperationRequest::Create, &RequestContext::default())
            .await
            .unwrap();

        let first = tracker
            .complete("sub-1", &operation.id, OperationResult::Succeeded)
            .await
            .unwrap();
        assert!(first.transitioned());
        assert_eq!(first.operation().status, OperationStatus::Succeeded);

        let failure = CloudErrorBody::new(codes::INTERNAL_SERVER_ERROR, "late failure");
        let second = tracker
            .complete("sub-1", &operation.id, OperationResult::Failed(failure))
            .await
            .unwrap();
        assert!(!second.transitioned());
        assert_eq!(second.operation().status, OperationStatus::Succeeded);
        assert!(second.operation().error.is_none());
        assert_eq!(
            second.operation().last_transition_time,
            first.operation().last_transition_time
        );
    }

    #[tokio::test]
    async fn cancel_records_reason() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        let operation = tracker
            .start(&target("dev"), OperationRequest::Update, &RequestContext::default())
            .await
            .unwrap();
        let completion = tracker
            .cancel("sub-1", &operation.id, OperationResult::superseded().into_error().unwrap())
            .await
            .unwrap();
        let canceled = completion.into_operation();
        assert_eq!(canceled.status, OperationStatus::Canceled);
        assert_eq!(canceled.error.unwrap().code, codes::CANCELED);
    }

    #[tokio::test]
    async fn mark_running_only_moves_forward() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        let operation = tracker
            .start(&target("dev"), OperationRequest::Create, &RequestContext::default())
            .await
            .unwrap();

        let running = tracker.mark_running("sub-1", &operation.id).await.unwrap();
        assert_eq!(running.status, OperationStatus::Running);
        let again = tracker.mark_running("sub-1", &operation.id).await.unwrap();
        assert_eq!(again.etag, running.etag);

        tracker
            .complete("sub-1", &operation.id, OperationResult::Succeeded)
            .await
            .unwrap();
        assert!(matches!(
            tracker.mark_running("sub-1", &operation.id).await,
            Err(FrontendError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_starts_yield_exactly_one_operation() {
        let store = MemoryStore::new();
        let tracker = Arc::new(tracker(&store));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                tracker
                    .start(&target("dev"), OperationRequest::Create, &RequestContext::default())
                    .await
            }));
        }

        let mut started = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => started += 1,
                Err(FrontendError::OperationInProgress(_))
                | Err(FrontendError::Conflict { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(started, 1);
    }

    #[tokio::test]
    async fn listing_follows_start_order() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        let mut started = Vec::new();
        for name in ["c", "a", "b"] {
            let operation = tracker
                .start(&target(name), OperationRequest::Create, &RequestContext::default())
                .await
                .unwrap();
            started.push(operation.id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let listed: Vec<_> = tracker
            .list_for_subscription("SUB-1", None)
            .with_page_size(2)
            .try_collect()
            .await
            .unwrap()
            .into_iter()
            .map(|operation| operation.id)
            .collect();
        assert_eq!(listed, started);

        let scoped = tracker
            .list_for_subscription("sub-1", Some(&target("a")))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id, started[1]);
    }

    #[tokio::test]
    async fn transient_store_failures_are_retried() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        store.fail_next(2);
        let operation = tracker
            .start(&target("dev"), OperationRequest::Create, &RequestContext::default())
            .await
            .unwrap();
        store.fail_next(3);
        assert_eq!(tracker.get("sub-1", &operation.id).await.unwrap().id, operation.id);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_as_unavailable() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        store.fail_next(10);
        assert!(matches!(
            tracker.get("sub-1", "anything").await,
            Err(FrontendError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn unknown_operation_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            tracker(&store).get("sub-1", "missing").await,
            Err(FrontendError::OperationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn pruning_removes_only_expired_terminal_operations() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        let ctx = RequestContext::default();
        let done = tracker
            .start(&target("done"), OperationRequest::Create, &ctx)
            .await
            .unwrap();
        tracker
            .complete("sub-1", &done.id, OperationResult::Succeeded)
            .await
            .unwrap();
        let running = tracker
            .start(&target("running"), OperationRequest::Create, &ctx)
            .await
            .unwrap();

        assert_eq!(tracker.prune_expired("sub-1", Utc::now()).await.unwrap(), 0);

        let later = Utc::now() + Duration::hours(25);
        assert_eq!(tracker.prune_expired("sub-1", later).await.unwrap(), 1);
        assert!(tracker.get("sub-1", &running.id).await.is_ok());
        assert!(tracker.get("sub-1", &done.id).await.is_err());
    }
}
