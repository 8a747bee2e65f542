use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

use crate::convert::{enforce_create_only, merge_patch, ApiVersion};
use crate::error::{FrontendError, StoreError};
use crate::logic::operations::{Completion, OperationTracker};
use crate::logic::provisioner::ClusterProvisioner;
use crate::logic::retry::{retry_with_backoff, RetryConfig};
use crate::model::{
    codes, CloudError, OperationDocument, OperationRequest, OperationResult, OperationStatus,
    OperationStatusResponse, ProvisioningState, RequestContext, ResourceDocument, ResourceId,
    ResourceType, SystemData,
};
use crate::store::{DocumentStoreExt, Precondition, Store};

const MAX_CONFLICT_ROUNDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationMethod {
    Put,
    Patch,
}

/// Result of an accepted mutation, ready to be rendered by the HTTP layer.
#[derive(Debug, Clone)]
pub struct MutationResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
    /// Operation to poll; also set when an in-flight one was reused.
    pub operation: Option<OperationDocument>,
}

/// Request-path composition of conversion, persistence and operation
/// tracking for create, update and delete.
pub struct MutationOrchestrator<S> {
    store: Arc<S>,
    tracker: OperationTracker<S>,
    provisioner: Arc<dyn ClusterProvisioner>,
    retry: RetryConfig,
    location: String,
}

impl<S: Store> MutationOrchestrator<S> {
    pub fn new(
        store: Arc<S>,
        tracker: OperationTracker<S>,
        provisioner: Arc<dyn ClusterProvisioner>,
        retry: RetryConfig,
        location: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tracker,
            provisioner,
            retry,
            location: location.into(),
        }
    }

    pub fn tracker(&self) -> &OperationTracker<S> {
        &self.tracker
    }

    /// Region this frontend serves; used in operation status paths.
    pub fn location(&self) -> &str {
        &self.location
    }

    async fn retry<T, F, Fut>(&self, name: &str, operation: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        retry_with_backoff(&self.retry, name, operation).await
    }

    async fn find(&self, id: &ResourceId) -> Result<Option<ResourceDocument>, FrontendError> {
        Ok(self
            .retry("read resource", || async move { self.store.resources().find(id).await })
            .await?)
    }

    async fn persist(
        &self,
        doc: &ResourceDocument,
        precondition: Precondition,
    ) -> Result<ResourceDocument, FrontendError> {
        let precondition = &precondition;
        Ok(self
            .retry("write resource", || async move {
                self.store
                    .resources()
                    .create_or_replace(doc, precondition.clone())
                    .await
            })
            .await?)
    }

    pub async fn create_or_update(
        &self,
        version: &dyn ApiVersion,
        id: &ResourceId,
        method: MutationMethod,
        body: &Value,
        ctx: &RequestContext,
    ) -> Result<MutationResponse, FrontendError> {
        let resource_type = resource_type_of(id)?;

        // Reject malformed payloads before touching the store.
        version.decode(id, resource_type, body, None)?;

        let parent = self.check_parent(id, resource_type).await?;
        let prior = self.find(id).await?;
        if let Some(prior) = &prior {
            if prior.provisioning_state == ProvisioningState::Deleting {
                return Err(FrontendError::Conflict {
                    target: id.to_string(),
                    message: format!("Resource '{}' is being deleted and cannot be modified", id),
                });
            }
        }
        if method == MutationMethod::Patch && prior.is_none() {
            return Err(FrontendError::NotFound(id.clone()));
        }

        let prior_external = prior.as_ref().map(|doc| version.encode(doc));
        let incoming = match (method, &prior_external) {
            (MutationMethod::Patch, Some(stored)) => patched(stored, body),
            _ => body.clone(),
        };

        let mut merged =
            version.copy_read_only_fields(resource_type, prior_external.as_ref(), &incoming)?;
        if let Some(stored) = &prior_external {
            let inventory = version.field_inventory(resource_type);
            let violations = enforce_create_only(inventory, stored, &mut merged);
            if let Some(error) = CloudError::content_validation(violations) {
                return Err(error.into());
            }
        }

        let mut doc = version.decode(id, resource_type, &merged, prior.clone())?;
        doc.provisioning_state = match &prior {
            None => ProvisioningState::Pending,
            Some(prior) if prior.provisioning_state.is_terminal() => ProvisioningState::Updating,
            Some(prior) => prior.provisioning_state,
        };
        doc.system_data = stamp_system_data(
            prior.as_ref().and_then(|p| p.system_data.as_ref()),
            ctx.system_data.as_ref(),
        );
        if resource_type.is_tracked() && doc.location.is_none() {
            doc.location = parent
                .as_ref()
                .and_then(|parent| parent.location.clone())
                .or_else(|| Some(self.location.clone()));
        }
        if let Some(error) = CloudError::content_validation(doc.validate()) {
            return Err(error.into());
        }

        let precondition = match &prior {
            Some(prior) => Precondition::from_etag(prior.etag.as_ref()),
            None => Precondition::IfNoneMatch,
        };
        let mut persisted = self.persist(&doc, precondition).await?;

        // A prior left mid-flight without an operation gets the request it
        // was persisted for; an in-flight one is reused below.
        let request = match &prior {
            None => OperationRequest::Create,
            Some(prior) => request_for(prior.provisioning_state),
        };
        let operation = match self.tracker.start(id, request, ctx).await {
            Ok(operation) => {
                if let Some(failed) = self.submit(&persisted, &operation).await? {
                    persisted = failed;
                }
                operation
            }
            Err(FrontendError::OperationInProgress(existing)) => {
                log::info!(
                    "{} already has operation {} in flight; reusing it",
                    id,
                    existing.id
                );
                *existing
            }
            Err(err) => {
                log::error!(
                    "{} persisted as {:?} without an operation: {}",
                    id,
                    persisted.provisioning_state,
                    err
                );
                return Err(err);
            }
        };

        let status = match (method, &prior) {
            (MutationMethod::Patch, _) => StatusCode::ACCEPTED,
            (MutationMethod::Put, None) => StatusCode::CREATED,
            (MutationMethod::Put, Some(_)) => StatusCode::OK,
        };
        Ok(MutationResponse {
            status,
            body: Some(version.encode(&persisted)),
            operation: Some(operation),
        })
    }

    /// For nested types, the parent document, which must exist.
    async fn check_parent(
        &self,
        id: &ResourceId,
        resource_type: ResourceType,
    ) -> Result<Option<ResourceDocument>, FrontendError> {
        if !resource_type.is_nested() {
            return Ok(None);
        }
        let parent_id = id
            .parent()
            .ok_or_else(|| FrontendError::NotFound(id.clone()))?;
        match self.find(&parent_id).await? {
            Some(parent) if parent.provisioning_state == ProvisioningState::Deleting => {
                Err(FrontendError::Conflict {
                    target: parent_id.to_string(),
                    message: format!("Parent resource '{parent_id}' is being deleted"),
                })
            }
            Some(parent) => Ok(Some(parent)),
            None => Err(FrontendError::ParentNotFound(parent_id)),
        }
    }

    /// Hand the operation to the provisioner. A rejected submission fails
    /// the operation, and the resource as updated by that is returned.
    async fn submit(
        &self,
        resource: &ResourceDocument,
        operation: &OperationDocument,
    ) -> Result<Option<ResourceDocument>, FrontendError> {
        let Err(error) = self.provisioner.submit(resource, operation).await else {
            return Ok(None);
        };
        log::error!(
            "provisioner rejected operation {} for {}: {}",
            operation.id,
            resource.id,
            error
        );
        self.finish_operation(
            &operation.subscription_id,
            &operation.id,
            OperationResult::Failed(error.error),
        )
        .await?;
        self.find(&resource.id).await
    }

    pub async fn delete(
        &self,
        id: &ResourceId,
        ctx: &RequestContext,
    ) -> Result<MutationResponse, FrontendError> {
        resource_type_of(id)?;
        let sub = id.subscription_id();
        let Some(mut doc) = self.find(id).await? else {
            return Err(FrontendError::NotFound(id.clone()));
        };

        if let Some(active) = self.tracker.active_for(id).await? {
            if active.request == OperationRequest::Delete {
                return Ok(accepted(active));
            }
            let superseded = OperationResult::superseded()
                .into_error()
                .ok_or_else(|| FrontendError::internal("superseded result carries no error"))?;
            self.tracker.cancel(sub, &active.id, superseded).await?;
            log::info!("delete of {} superseded operation {}", id, active.id);
        }

        if doc.provisioning_state != ProvisioningState::Deleting {
            let precondition = Precondition::from_etag(doc.etag.as_ref());
            doc.provisioning_state = ProvisioningState::Deleting;
            doc = self.persist(&doc, precondition).await?;
        }

        let operation = match self.tracker.start(id, OperationRequest::Delete, ctx).await {
            Ok(operation) => {
                self.submit(&doc, &operation).await?;
                operation
            }
            Err(FrontendError::OperationInProgress(existing))
                if existing.request == OperationRequest::Delete =>
            {
                *existing
            }
            Err(err) => return Err(err),
        };
        Ok(accepted(operation))
    }

    /// Read one resource. A resource left mid-flight without an operation,
    /// for instance after a crash between persisting and starting the
    /// operation, gets its operation recreated here.
    pub async fn get(
        &self,
        version: &dyn ApiVersion,
        id: &ResourceId,
    ) -> Result<Value, FrontendError> {
        resource_type_of(id)?;
        let doc = self
            .find(id)
            .await?
            .ok_or_else(|| FrontendError::NotFound(id.clone()))?;
        if !doc.provisioning_state.is_terminal() {
            if let Err(err) = self.reconcile_orphan(&doc).await {
                log::warn!("could not reconcile {}: {}", id, err);
            }
        }
        Ok(version.encode(&doc))
    }

    async fn reconcile_orphan(&self, doc: &ResourceDocument) -> Result<(), FrontendError> {
        if self.tracker.active_for(&doc.id).await?.is_some() {
            return Ok(());
        }
        let request = request_for(doc.provisioning_state);
        match self
            .tracker
            .start(&doc.id, request, &RequestContext::default())
            .await
        {
            Ok(operation) => {
                log::warn!(
                    "{} was {:?} with no operation; started {}",
                    doc.id,
                    doc.provisioning_state,
                    operation.id
                );
                self.submit(doc, &operation).await?;
                Ok(())
            }
            Err(FrontendError::OperationInProgress(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Every resource of `resource_type` at or beneath `scope`, in the ARM
    /// list envelope.
    pub async fn list(
        &self,
        version: &dyn ApiVersion,
        scope: &ResourceId,
        resource_type: ResourceType,
    ) -> Result<Value, FrontendError> {
        let documents = self
            .retry("list resources", || async move {
                self.store.resources().list_recursive(scope).try_collect().await
            })
            .await?;
        let value: Vec<Value> = documents
            .iter()
            .filter(|doc| doc.resource_type() == resource_type)
            .map(|doc| version.encode(doc))
            .collect();
        Ok(json!({ "value": value }))
    }

    /// Record the outcome reported by the backend and, if this call is the
    /// one that completed the operation, apply it to the resource.
    pub async fn finish_operation(
        &self,
        sub: &str,
        operation_id: &str,
        result: OperationResult,
    ) -> Result<OperationDocument, FrontendError> {
        let completion = self.tracker.complete(sub, operation_id, result).await?;
        let Completion::Transitioned(operation) = completion else {
            return Ok(completion.into_operation());
        };

        if let Some(newer) = self.tracker.active_for(&operation.target).await? {
            log::debug!(
                "{} is owned by operation {}; not applying {}",
                operation.target,
                newer.id,
                operation.id
            );
            return Ok(operation);
        }

        if operation.request == OperationRequest::Delete
            && operation.status == OperationStatus::Succeeded
        {
            self.remove_tree(&operation.target).await?;
        } else {
            self.apply_state(&operation).await?;
        }
        Ok(operation)
    }

    async fn apply_state(&self, operation: &OperationDocument) -> Result<(), FrontendError> {
        let state = match operation.status {
            OperationStatus::Succeeded => ProvisioningState::Succeeded,
            OperationStatus::Failed => ProvisioningState::Failed,
            OperationStatus::Canceled => ProvisioningState::Canceled,
            OperationStatus::Pending | OperationStatus::Running => return Ok(()),
        };
        for _ in 0..MAX_CONFLICT_ROUNDS {
            let Some(mut doc) = self.find(&operation.target).await? else {
                return Ok(());
            };
            let precondition = Precondition::from_etag(doc.etag.as_ref());
            doc.provisioning_state = state;
            match self.persist(&doc, precondition).await {
                Ok(_) => return Ok(()),
                Err(FrontendError::Conflict { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(FrontendError::Conflict {
            target: operation.target.to_string(),
            message: "The resource is being modified concurrently".to_string(),
        })
    }

    /// Remove a resource and everything nested beneath it, deepest first.
    async fn remove_tree(&self, root: &ResourceId) -> Result<(), FrontendError> {
        let mut documents = self
            .retry("list resources", || async move {
                self.store.resources().list_recursive(root).try_collect().await
            })
            .await?;
        documents.sort_by_key(|doc| std::cmp::Reverse(doc.id.to_string().len()));

        let sub = root.subscription_id();
        for doc in &documents {
            if doc.id != *root {
                if let Some(active) = self.tracker.active_for(&doc.id).await? {
                    if let Some(reason) = OperationResult::superseded().into_error() {
                        self.tracker.cancel(sub, &active.id, reason).await?;
                    }
                }
            }
            let id = &doc.id;
            let removed = self
                .retry("delete resource", || async move {
                    self.store.resources().delete(id, Precondition::None).await
                })
                .await;
            match removed {
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        log::info!("removed {} and {} nested resources", root, documents.len().saturating_sub(1));
        Ok(())
    }

    pub async fn operation_status(
        &self,
        sub: &str,
        operation_id: &str,
    ) -> Result<OperationStatusResponse, FrontendError> {
        let operation = self.tracker.get(sub, operation_id).await?;
        Ok(operation.to_status_response(&self.location))
    }
}

fn resource_type_of(id: &ResourceId) -> Result<ResourceType, FrontendError> {
    ResourceType::from_resource_id(id).ok_or_else(|| {
        CloudError::new(
            400,
            codes::INVALID_RESOURCE_TYPE,
            Some(id.to_string()),
            format!(
                "The resource type '{}' is not supported",
                id.resource_type().unwrap_or_default()
            ),
        )
        .into()
    })
}

/// Request that brings a resource in `state` to its goal. Terminal states
/// only change through an update.
fn request_for(state: ProvisioningState) -> OperationRequest {
    match state {
        ProvisioningState::Deleting => OperationRequest::Delete,
        ProvisioningState::Pending | ProvisioningState::Provisioning => OperationRequest::Create,
        _ => OperationRequest::Update,
    }
}

/// Merge patch over the stored representation; `tags` is replaced as a
/// whole rather than merged key by key.
fn patched(stored: &Value, patch: &Value) -> Value {
    let mut target = stored.clone();
    merge_patch(&mut target, patch);
    if let (Some(tags), Value::Object(object)) = (patch.get("tags"), &mut target) {
        let tags = if tags.is_null() { json!({}) } else { tags.clone() };
        object.insert("tags".to_string(), tags);
    }
    target
}

/// Creation fields come from the first write, modification fields from
/// the current request.
fn stamp_system_data(
    prior: Option<&SystemData>,
    incoming: Option<&SystemData>,
) -> Option<SystemData> {
    match (prior, incoming) {
        (Some(prior), Some(incoming)) => Some(SystemData {
            created_by: prior.created_by.clone().or_else(|| incoming.created_by.clone()),
            created_by_type: prior.created_by_type.or(incoming.created_by_type),
            created_at: prior.created_at.or(incoming.created_at),
            last_modified_by: incoming.last_modified_by.clone(),
            last_modified_by_type: incoming.last_modified_by_type,
            last_modified_at: incoming.last_modified_at.or_else(|| Some(Utc::now())),
        }),
        (prior, None) => prior.cloned(),
        (None, Some(incoming)) => Some(incoming.clone()),
    }
}

fn accepted(operation: OperationDocument) -> MutationResponse {
    MutationResponse {
        status: StatusCode::ACCEPTED,
        body: None,
        operation: Some(operation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ApiVersions, V20240610Preview, V20251223Preview, VersionSchema};
    use crate::model::CloudErrorBody;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingProvisioner {
        submitted: Mutex<Vec<(ResourceId, OperationRequest)>>,
        reject: Mutex<Option<CloudError>>,
    }

    #[async_trait::async_trait]
    impl ClusterProvisioner for RecordingProvisioner {
        async fn submit(
            &self,
            resource: &ResourceDocument,
            operation: &OperationDocument,
        ) -> Result<(), CloudError> {
            self.submitted
                .lock()
                .push((resource.id.clone(), operation.request));
            match self.reject.lock().take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    struct Harness {
        store: MemoryStore,
        provisioner: Arc<RecordingProvisioner>,
        orchestrator: MutationOrchestrator<MemoryStore>,
        versions: ApiVersions,
    }

    impl Harness {
        fn new() -> Self {
            let store = MemoryStore::new();
            let shared = Arc::new(store.clone());
            let retry = RetryConfig::immediate(3);
            let provisioner = Arc::new(RecordingProvisioner::default());
            let tracker = OperationTracker::new(shared.clone(), retry.clone(), Duration::hours(1));
            let orchestrator =
                MutationOrchestrator::new(shared, tracker, provisioner.clone(), retry, "eastus");
            Self {
                store,
                provisioner,
                orchestrator,
                versions: ApiVersions::default(),
            }
        }

        fn v1(&self) -> Arc<dyn ApiVersion> {
            self.versions.get(V20240610Preview::NAME).unwrap()
        }

        fn v2(&self) -> Arc<dyn ApiVersion> {
            self.versions.get(V20251223Preview::NAME).unwrap()
        }

        async fn put(
            &self,
            id: &ResourceId,
            body: Value,
        ) -> Result<MutationResponse, FrontendError> {
            let ctx = RequestContext::default();
            self.orchestrator
                .create_or_update(self.v1().as_ref(), id, MutationMethod::Put, &body, &ctx)
                .await
        }

        async fn stored(&self, id: &ResourceId) -> ResourceDocument {
            self.store.resources().get(id).await.unwrap()
        }
    }

    fn cluster_id() -> ResourceId {
        ResourceId::provider_resource("sub-1", "rg", "hcpOpenShiftClusters", "c1")
    }

    fn cluster_body() -> Value {
        json!({
            "location": "westus",
            "tags": {"env": "dev"},
            "properties": {"platform": {"subnetId": "/subnets/a"}}
        })
    }

    fn node_pool_body() -> Value {
        json!({"properties": {"platform": {"vmSize": "Standard_D8s_v3"}, "replicas": 2}})
    }

    #[tokio::test]
    async fn create_persists_pending_resource_and_operation() {
        let h = Harness::new();
        let response = h.put(&cluster_id(), cluster_body()).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);

        let body = response.body.unwrap();
        assert_eq!(body["properties"]["provisioningState"], "Pending");
        assert_eq!(body["id"], cluster_id().to_string());
        assert_eq!(body["name"], "c1");

        let operation = response.operation.unwrap();
        assert_eq!(operation.status, OperationStatus::Pending);
        assert_eq!(operation.request, OperationRequest::Create);
        assert_eq!(h.provisioner.submitted.lock().len(), 1);
        assert_eq!(h.stored(&cluster_id()).await.location.as_deref(), Some("westus"));
    }

    #[tokio::test]
    async fn read_only_state_in_update_is_ignored() {
        let h = Harness::new();
        let created = h.put(&cluster_id(), cluster_body()).await.unwrap();

        let mut body = cluster_body();
        body["properties"]["provisioningState"] = json!("Succeeded");
        let updated = h.put(&cluster_id(), body).await.unwrap();
        assert_eq!(updated.status, StatusCode::OK);
        assert_eq!(updated.body.unwrap()["properties"]["provisioningState"], "Pending");
        // The create is still in flight, so its operation is reported.
        assert_eq!(updated.operation.unwrap().id, created.operation.unwrap().id);
        assert_eq!(h.stored(&cluster_id()).await.provisioning_state, ProvisioningState::Pending);
    }

    #[tokio::test]
    async fn completion_updates_operation_and_resource_once() {
        let h = Harness::new();
        let created = h.put(&cluster_id(), cluster_body()).await.unwrap();
        let op = created.operation.unwrap();

        let failure = CloudErrorBody::new(codes::INTERNAL_SERVER_ERROR, "install failed");
        let failed = h
            .orchestrator
            .finish_operation("sub-1", &op.id, OperationResult::Failed(failure))
            .await
            .unwrap();
        assert_eq!(failed.status, OperationStatus::Failed);

        let again = h
            .orchestrator
            .finish_operation("sub-1", &op.id, OperationResult::Succeeded)
            .await
            .unwrap();
        assert_eq!(again.status, OperationStatus::Failed);
        assert_eq!(h.stored(&cluster_id()).await.provisioning_state, ProvisioningState::Failed);

        let status = h.orchestrator.operation_status("sub-1", &op.id).await.unwrap();
        assert_eq!(status.status, OperationStatus::Failed);
        assert_eq!(status.error.unwrap().message, "install failed");
        assert!(status.end_time.is_some());
    }

    #[tokio::test]
    async fn update_after_success_moves_to_updating() {
        let h = Harness::new();
        let created = h.put(&cluster_id(), cluster_body()).await.unwrap();
        h.orchestrator
            .finish_operation("sub-1", &created.operation.unwrap().id, OperationResult::Succeeded)
            .await
            .unwrap();

        let updated = h.put(&cluster_id(), cluster_body()).await.unwrap();
        let body = updated.body.unwrap();
        assert_eq!(body["properties"]["provisioningState"], "Updating");
        assert_eq!(updated.operation.unwrap().request, OperationRequest::Update);
    }

    #[tokio::test]
    async fn patch_merges_over_stored_state() {
        let h = Harness::new();
        let created = h.put(&cluster_id(), cluster_body()).await.unwrap();
        h.orchestrator
            .finish_operation("sub-1", &created.operation.unwrap().id, OperationResult::Succeeded)
            .await
            .unwrap();

        let response = h
            .orchestrator
            .create_or_update(
                h.v1().as_ref(),
                &cluster_id(),
                MutationMethod::Patch,
                &json!({
                    "tags": {"team": "infra"},
                    "properties": {"version": {"channelGroup": "fast"}}
                }),
                &RequestContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::ACCEPTED);

        let stored = h.stored(&cluster_id()).await;
        assert_eq!(stored.tags.len(), 1);
        assert_eq!(stored.tags["team"], "infra");
        let cluster = stored.as_cluster().unwrap();
        assert_eq!(cluster.version.channel_group, "fast");
        assert_eq!(cluster.platform.subnet_id, "/subnets/a");
    }

    #[tokio::test]
    async fn patch_of_missing_resource_is_not_found() {
        let h = Harness::new();
        let result = h
            .orchestrator
            .create_or_update(
                h.v1().as_ref(),
                &cluster_id(),
                MutationMethod::Patch,
                &json!({}),
                &RequestContext::default(),
            )
            .await;
        assert!(matches!(result, Err(FrontendError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_only_fields_cannot_change() {
        let h = Harness::new();
        h.put(&cluster_id(), cluster_body()).await.unwrap();

        let mut body = cluster_body();
        body["properties"]["network"] = json!({"podCidr": "10.200.0.0/14"});
        let err = h.put(&cluster_id(), body).await.unwrap_err();
        let cloud = err.to_cloud_error();
        assert_eq!(cloud.status_code, 400);
        assert_eq!(cloud.error.target.as_deref(), Some("properties.network.podCidr"));

        // Leaving it out keeps the stored value.
        let mut body = cluster_body();
        body["properties"]
            .as_object_mut()
            .unwrap()
            .insert("api".into(), json!({}));
        h.put(&cluster_id(), body).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_content_is_rejected_without_side_effects() {
        let h = Harness::new();
        let err = h
            .put(&cluster_id(), json!({"properties": {"network": {"hostPrefix": 30}}}))
            .await
            .unwrap_err();
        assert_eq!(err.to_cloud_error().error.code, codes::MULTIPLE_ERRORS_OCCURRED);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn nested_resource_requires_parent() {
        let h = Harness::new();
        let pool = cluster_id().child("nodePools", "np1");
        assert!(matches!(
            h.put(&pool, node_pool_body()).await,
            Err(FrontendError::ParentNotFound(_))
        ));

        h.put(&cluster_id(), cluster_body()).await.unwrap();
        let created = h.put(&pool, node_pool_body()).await.unwrap();
        assert_eq!(created.status, StatusCode::CREATED);
        // Node pools inherit the cluster's region.
        assert_eq!(h.stored(&pool).await.location.as_deref(), Some("westus"));
    }

    #[tokio::test]
    async fn delete_supersedes_in_flight_create() {
        let h = Harness::new();
        let created = h.put(&cluster_id(), cluster_body()).await.unwrap();
        let create_op = created.operation.unwrap();

        let deleted = h
            .orchestrator
            .delete(&cluster_id(), &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(deleted.status, StatusCode::ACCEPTED);
        let delete_op = deleted.operation.unwrap();
        assert_eq!(delete_op.request, OperationRequest::Delete);

        let canceled = h.orchestrator.tracker().get("sub-1", &create_op.id).await.unwrap();
        assert_eq!(canceled.status, OperationStatus::Canceled);
        assert_eq!(
            canceled.error.unwrap().message,
            "This operation was superseded by another"
        );
        assert_eq!(h.stored(&cluster_id()).await.provisioning_state, ProvisioningState::Deleting);

        let again = h
            .orchestrator
            .delete(&cluster_id(), &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(again.operation.unwrap().id, delete_op.id);

        // Mutations of a resource being deleted are refused.
        assert!(matches!(
            h.put(&cluster_id(), cluster_body()).await,
            Err(FrontendError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn successful_delete_removes_nested_resources() {
        let h = Harness::new();
        let created = h.put(&cluster_id(), cluster_body()).await.unwrap();
        h.orchestrator
            .finish_operation("sub-1", &created.operation.unwrap().id, OperationResult::Succeeded)
            .await
            .unwrap();
        let pool = cluster_id().child("nodePools", "np1");
        h.put(&pool, node_pool_body()).await.unwrap();

        let deleted = h
            .orchestrator
            .delete(&cluster_id(), &RequestContext::default())
            .await
            .unwrap();
        h.orchestrator
            .finish_operation("sub-1", &deleted.operation.unwrap().id, OperationResult::Succeeded)
            .await
            .unwrap();

        assert!(h.store.resources().find(&cluster_id()).await.unwrap().is_none());
        assert!(h.store.resources().find(&pool).await.unwrap().is_none());
        assert!(matches!(
            h.orchestrator.get(h.v1().as_ref(), &cluster_id()).await,
            Err(FrontendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_of_missing_resource_is_not_found() {
        let h = Harness::new();
        assert!(matches!(
            h.orchestrator.delete(&cluster_id(), &RequestContext::default()).await,
            Err(FrontendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn get_reconciles_orphaned_resource() {
        let h = Harness::new();
        let mut doc = ResourceDocument::new(cluster_id(), ResourceType::Cluster);
        doc.provisioning_state = ProvisioningState::Provisioning;
        h.store
            .resources()
            .create_or_replace(&doc, Precondition::IfNoneMatch)
            .await
            .unwrap();

        let body = h.orchestrator.get(h.v2().as_ref(), &cluster_id()).await.unwrap();
        assert_eq!(body["properties"]["provisioningState"], "Provisioning");

        let active = h.orchestrator.tracker().active_for(&cluster_id()).await.unwrap().unwrap();
        assert_eq!(active.request, OperationRequest::Create);
        assert_eq!(h.provisioner.submitted.lock().len(), 1);

        // A second read finds the operation and does not start another.
        h.orchestrator.get(h.v2().as_ref(), &cluster_id()).await.unwrap();
        assert_eq!(h.provisioner.submitted.lock().len(), 1);
    }

    #[tokio::test]
    async fn retried_put_recreates_missing_operation() {
        let h = Harness::new();
        // What a create leaves behind when starting its operation fails
        // after the resource was written.
        let mut doc = h
            .v1()
            .decode(&cluster_id(), ResourceType::Cluster, &cluster_body(), None)
            .unwrap();
        doc.provisioning_state = ProvisioningState::Pending;
        h.store
            .resources()
            .create_or_replace(&doc, Precondition::IfNoneMatch)
            .await
            .unwrap();

        let retried = h.put(&cluster_id(), cluster_body()).await.unwrap();
        assert_eq!(retried.body.unwrap()["properties"]["provisioningState"], "Pending");
        let operation = retried.operation.unwrap();
        assert_eq!(operation.request, OperationRequest::Create);
        assert_eq!(h.provisioner.submitted.lock().len(), 1);

        // Another retry reuses the recreated operation.
        let again = h.put(&cluster_id(), cluster_body()).await.unwrap();
        assert_eq!(again.operation.unwrap().id, operation.id);
        assert_eq!(h.provisioner.submitted.lock().len(), 1);

        let operations = h
            .orchestrator
            .tracker()
            .list_for_subscription("sub-1", Some(&cluster_id()))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].id, operation.id);
    }

    #[tokio::test]
    async fn rejected_submission_fails_operation() {
        let h = Harness::new();
        *h.provisioner.reject.lock() = Some(CloudError::service_unavailable());
        let created = h.put(&cluster_id(), cluster_body()).await.unwrap();

        assert_eq!(created.body.unwrap()["properties"]["provisioningState"], "Failed");
        let op = h
            .orchestrator
            .tracker()
            .get("sub-1", &created.operation.unwrap().id)
            .await
            .unwrap();
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.error.unwrap().code, codes::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn list_filters_by_type_and_encodes_per_version() {
        let h = Harness::new();
        h.put(&cluster_id(), cluster_body()).await.unwrap();
        h.put(&cluster_id().child("nodePools", "a"), node_pool_body())
            .await
            .unwrap();
        h.put(&cluster_id().child("nodePools", "b"), node_pool_body())
            .await
            .unwrap();

        let pools = h
            .orchestrator
            .list(h.v2().as_ref(), &cluster_id(), ResourceType::NodePool)
            .await
            .unwrap();
        let names: Vec<_> = pools["value"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pool| pool["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(pools["value"][0]["properties"].get("taints").is_some());

        let clusters = h
            .orchestrator
            .list(
                h.v1().as_ref(),
                &ResourceId::resource_group_scope("sub-1", "rg"),
                ResourceType::Cluster,
            )
            .await
            .unwrap();
        assert_eq!(clusters["value"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn system_data_keeps_creation_fields() {
        let h = Harness::new();
        let first = RequestContext {
            system_data: Some(SystemData {
                created_by: Some("alice".into()),
                last_modified_by: Some("alice".into()),
                ..SystemData::default()
            }),
            ..RequestContext::default()
        };
        let second = RequestContext {
            system_data: Some(SystemData {
                created_by: Some("mallory".into()),
                last_modified_by: Some("bob".into()),
                ..SystemData::default()
            }),
            ..RequestContext::default()
        };
        let v1 = h.v1();
        for ctx in [&first, &second] {
            h.orchestrator
                .create_or_update(
                    v1.as_ref(),
                    &cluster_id(),
                    MutationMethod::Put,
                    &cluster_body(),
                    ctx,
                )
                .await
                .unwrap();
        }
        let system_data = h.stored(&cluster_id()).await.system_data.unwrap();
        assert_eq!(system_data.created_by.as_deref(), Some("alice"));
        assert_eq!(system_data.last_modified_by.as_deref(), Some("bob"));
    }
}
