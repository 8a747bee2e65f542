use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::request_context::RequestedVersion;
use crate::api::AppState;
use crate::convert::ApiVersion;
use crate::error::FrontendError;
use crate::logic::{MutationMethod, MutationResponse};
use crate::model::{CloudError, OperationDocument, RequestContext, ResourceId, ResourceType};
use crate::store::Store;

pub const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Path parameters shared by every resource route. Which child name is
/// present decides the resource type.
#[derive(Debug, Deserialize)]
pub struct ResourcePath {
    pub subscription_id: String,
    pub resource_group_name: String,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub node_pool_name: Option<String>,
    #[serde(default)]
    pub external_auth_name: Option<String>,
}

impl ResourcePath {
    fn cluster_id(&self) -> Option<ResourceId> {
        self.cluster_name.as_deref().map(|cluster| {
            ResourceId::provider_resource(
                &self.subscription_id,
                &self.resource_group_name,
                ResourceType::Cluster.segment(),
                cluster,
            )
        })
    }

    /// Id of the addressed resource, or the enclosing scope for list routes.
    pub fn resource_id(&self) -> ResourceId {
        let Some(cluster) = self.cluster_id() else {
            return ResourceId::resource_group_scope(
                &self.subscription_id,
                &self.resource_group_name,
            );
        };
        if let Some(name) = &self.node_pool_name {
            cluster.child(ResourceType::NodePool.segment(), name)
        } else if let Some(name) = &self.external_auth_name {
            cluster.child(ResourceType::ExternalAuth.segment(), name)
        } else {
            cluster
        }
    }
}

pub async fn get_resource<S: Store>(
    State(state): State<AppState<S>>,
    RequestedVersion(version): RequestedVersion,
    Path(path): Path<ResourcePath>,
) -> Result<Json<Value>, FrontendError> {
    let id = path.resource_id();
    let body = state.orchestrator.get(version.as_ref(), &id).await?;
    Ok(Json(body))
}

pub async fn put_resource<S: Store>(
    State(state): State<AppState<S>>,
    RequestedVersion(version): RequestedVersion,
    Path(path): Path<ResourcePath>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Response, FrontendError> {
    mutate(&state, version.as_ref(), &path.resource_id(), MutationMethod::Put, &body, &ctx).await
}

pub async fn patch_resource<S: Store>(
    State(state): State<AppState<S>>,
    RequestedVersion(version): RequestedVersion,
    Path(path): Path<ResourcePath>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Response, FrontendError> {
    mutate(&state, version.as_ref(), &path.resource_id(), MutationMethod::Patch, &body, &ctx).await
}

async fn mutate<S: Store>(
    state: &AppState<S>,
    version: &dyn ApiVersion,
    id: &ResourceId,
    method: MutationMethod,
    body: &[u8],
    ctx: &RequestContext,
) -> Result<Response, FrontendError> {
    let payload = parse_body(body)?;
    let response = state
        .orchestrator
        .create_or_update(version, id, method, &payload, ctx)
        .await?;
    log::info!("{:?} {} -> {}", method, id, response.status);
    Ok(render(state, response, ctx))
}

pub async fn delete_resource<S: Store>(
    State(state): State<AppState<S>>,
    RequestedVersion(_version): RequestedVersion,
    Path(path): Path<ResourcePath>,
    ctx: RequestContext,
) -> Result<Response, FrontendError> {
    let id = path.resource_id();
    let response = state.orchestrator.delete(&id, &ctx).await?;
    log::info!("DELETE {} -> {}", id, response.status);
    Ok(render(&state, response, &ctx))
}

pub async fn list_clusters<S: Store>(
    state: State<AppState<S>>,
    version: RequestedVersion,
    path: Path<ResourcePath>,
) -> Result<Json<Value>, FrontendError> {
    list(state, version, path, ResourceType::Cluster).await
}

pub async fn list_node_pools<S: Store>(
    state: State<AppState<S>>,
    version: RequestedVersion,
    path: Path<ResourcePath>,
) -> Result<Json<Value>, FrontendError> {
    list(state, version, path, ResourceType::NodePool).await
}

pub async fn list_external_auths<S: Store>(
    state: State<AppState<S>>,
    version: RequestedVersion,
    path: Path<ResourcePath>,
) -> Result<Json<Value>, FrontendError> {
    list(state, version, path, ResourceType::ExternalAuth).await
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
    RequestedVersion(version): RequestedVersion,
    Path(path): Path<ResourcePath>,
    resource_type: ResourceType,
) -> Result<Json<Value>, FrontendError> {
    let scope = path.resource_id();
    let body = state
        .orchestrator
        .list(version.as_ref(), &scope, resource_type)
        .await?;
    Ok(Json(body))
}

pub async fn get_operation_status<S: Store>(
    State(state): State<AppState<S>>,
    RequestedVersion(_version): RequestedVersion,
    Path((subscription_id, _location, operation_id)): Path<(String, String, String)>,
) -> Result<Response, FrontendError> {
    let status = state
        .orchestrator
        .operation_status(&subscription_id, &operation_id)
        .await?;
    Ok(Json(status).into_response())
}

#[derive(Debug, Deserialize)]
pub struct OperationListQuery {
    #[serde(rename = "resourceId")]
    pub resource_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OperationListResponse {
    pub value: Vec<OperationDocument>,
}

/// Operations of a subscription, oldest first.
pub async fn list_operations<S: Store>(
    State(state): State<AppState<S>>,
    Path(subscription_id): Path<String>,
    Query(query): Query<OperationListQuery>,
) -> Result<Json<OperationListResponse>, FrontendError> {
    let scope = query
        .resource_id
        .as_deref()
        .map(ResourceId::parse)
        .transpose()
        .map_err(|err| CloudError::invalid_parameter("resourceId", err.to_string()))?;

    let value = state
        .orchestrator
        .tracker()
        .list_for_subscription(&subscription_id, scope.as_ref())
        .try_collect()
        .await?;
    Ok(Json(OperationListResponse { value }))
}

pub async fn prune_operations<S: Store>(
    State(state): State<AppState<S>>,
    Path(subscription_id): Path<String>,
) -> Result<Json<Value>, FrontendError> {
    let pruned = state
        .orchestrator
        .tracker()
        .prune_expired(&subscription_id, Utc::now())
        .await?;
    Ok(Json(json!({ "pruned": pruned })))
}

fn parse_body(body: &[u8]) -> Result<Value, FrontendError> {
    if body.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|err| {
        CloudError::invalid_request_content(format!(
            "The request content was invalid and could not be deserialized: {err}"
        ))
        .into()
    })
}

/// Status, polling headers and body of an accepted mutation.
fn render<S: Store>(
    state: &AppState<S>,
    response: MutationResponse,
    ctx: &RequestContext,
) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(operation) = &response.operation {
        let path = operation.status_path(state.orchestrator.location());
        let url = match ctx.base_url() {
            Some(base) => format!("{base}{path}"),
            None => path,
        };
        if let Ok(value) = HeaderValue::from_str(&url) {
            headers.insert(HeaderName::from_static(AZURE_ASYNC_OPERATION), value.clone());
            if response.status == StatusCode::ACCEPTED {
                headers.insert(header::LOCATION, value);
            }
        }
    }
    match response.body {
        Some(body) => (response.status, headers, Json(body)).into_response(),
        None => (response.status, headers).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(
        cluster: Option<&str>,
        node_pool: Option<&str>,
        external_auth: Option<&str>,
    ) -> ResourcePath {
        ResourcePath {
            subscription_id: "sub".into(),
            resource_group_name: "rg".into(),
            cluster_name: cluster.map(Into::into),
            node_pool_name: node_pool.map(Into::into),
            external_auth_name: external_auth.map(Into::into),
        }
    }

    #[test]
    fn test_path_resolves_resource_type() {
        let cluster = path(Some("c1"), None, None).resource_id();
        assert_eq!(ResourceType::from_resource_id(&cluster), Some(ResourceType::Cluster));

        let pool = path(Some("c1"), Some("np"), None).resource_id();
        assert_eq!(ResourceType::from_resource_id(&pool), Some(ResourceType::NodePool));
        assert_eq!(pool.parent(), Some(cluster));

        let auth = path(Some("c1"), None, Some("ea")).resource_id();
        assert_eq!(ResourceType::from_resource_id(&auth), Some(ResourceType::ExternalAuth));

        let scope = path(None, None, None).resource_id();
        assert!(!scope.is_resource());
        assert_eq!(scope.resource_group(), Some("rg"));
    }

    #[test]
    fn test_empty_body_is_an_empty_object() {
        assert_eq!(parse_body(b"").unwrap(), json!({}));
        assert!(matches!(parse_body(b"{"), Err(FrontendError::Invalid(_))));
    }
}
