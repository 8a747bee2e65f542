//! Error types for the store boundary and the request path.
//!
//! Store failures are classified once, where they are raised, as
//! [`StoreError`]. The request path converts them into [`FrontendError`],
//! which knows how to render itself as an ARM [`CloudError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::model::{CloudError, OperationDocument, ResourceId};

/// Failure reported by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    /// Concurrency token mismatch, or the document already exists.
    #[error("precondition failed for document {0}")]
    Conflict(String),

    /// Timeouts, throttling and other failures that may succeed if repeated.
    #[error("transient store failure: {0}")]
    Retryable(String),

    #[error("invalid document key: {0}")]
    InvalidKey(String),

    #[error("malformed document {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Failure of a frontend request, rendered as an ARM error response.
#[derive(Debug, Error)]
pub enum FrontendError {
    /// Client-correctable input problem; already shaped as a cloud error.
    #[error("{0}")]
    Invalid(CloudError),

    #[error("resource not found: {0}")]
    NotFound(ResourceId),

    #[error("parent resource not found: {0}")]
    ParentNotFound(ResourceId),

    #[error("operation not found: {0}")]
    OperationNotFound(String),

    /// Lost a conditional write or the resource is in a state that
    /// forbids the request. Safe to retry after re-reading.
    #[error("conflict on {target}: {message}")]
    Conflict { target: String, message: String },

    #[error("operation {} is already in progress for {}", .0.id, .0.target)]
    OperationInProgress(Box<OperationDocument>),

    /// Transient store failure that outlasted the retry budget.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FrontendError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    pub fn to_cloud_error(&self) -> CloudError {
        match self {
            Self::Invalid(error) => error.clone(),
            Self::NotFound(id) => CloudError::resource_not_found(id),
            Self::ParentNotFound(parent) => CloudError::parent_resource_not_found(parent),
            Self::OperationNotFound(id) => CloudError::operation_not_found(id),
            Self::Conflict { target, message } => {
                CloudError::conflict(Some(target.clone()), message.clone())
            }
            Self::OperationInProgress(operation) => CloudError::conflict(
                Some(operation.target.to_string()),
                format!(
                    "Operation {} is already in progress for this resource",
                    operation.id
                ),
            ),
            Self::Unavailable(_) => CloudError::service_unavailable(),
            Self::Internal(_) => CloudError::internal_server_error(),
        }
    }
}

impl From<StoreError> for FrontendError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(key) => Self::Conflict {
                target: key,
                message: "The resource was modified concurrently. Re-read it and retry the request."
                    .to_string(),
            },
            StoreError::Retryable(_) => Self::Unavailable(err),
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<CloudError> for FrontendError {
    fn from(err: CloudError) -> Self {
        Self::Invalid(err)
    }
}

impl IntoResponse for CloudError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for FrontendError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(err) => log::error!("internal error: {err:#}"),
            Self::Unavailable(err) => log::warn!("store unavailable after retries: {err}"),
            _ => log::debug!("request rejected: {self}"),
        }
        self.to_cloud_error().into_response()
    }
}
