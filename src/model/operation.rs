use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    codes, generate_ordered_id, CloudErrorBody, ETag, Id, ResourceId, PROVIDER_NAMESPACE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationRequest {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// Terminal outcome reported for an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    Succeeded,
    Failed(CloudErrorBody),
    Canceled(CloudErrorBody),
}

impl OperationResult {
    /// Cancellation caused by a newer request on the same resource.
    pub fn superseded() -> Self {
        Self::Canceled(CloudErrorBody::new(
            codes::CANCELED,
            "This operation was superseded by another",
        ))
    }

    pub fn status(&self) -> OperationStatus {
        match self {
            Self::Succeeded => OperationStatus::Succeeded,
            Self::Failed(_) => OperationStatus::Failed,
            Self::Canceled(_) => OperationStatus::Canceled,
        }
    }

    pub fn into_error(self) -> Option<CloudErrorBody> {
        match self {
            Self::Succeeded => None,
            Self::Failed(error) | Self::Canceled(error) => Some(error),
        }
    }
}

/// Tracking record of one asynchronous mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDocument {
    pub id: Id,
    pub subscription_id: String,
    pub target: ResourceId,
    pub request: OperationRequest,
    pub status: OperationStatus,
    pub start_time: DateTime<Utc>,
    pub last_transition_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CloudErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_request_id: Option<String>,
    #[serde(skip)]
    pub etag: Option<ETag>,
}

impl OperationDocument {
    pub fn new(target: ResourceId, request: OperationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: generate_ordered_id(),
            subscription_id: target.subscription_id().to_string(),
            target,
            request,
            status: OperationStatus::Pending,
            start_time: now,
            last_transition_time: now,
            error: None,
            client_request_id: None,
            correlation_request_id: None,
            etag: None,
        }
    }

    /// Human-readable summary of a terminal transition.
    pub fn transition_message(&self) -> String {
        let verb = match self.request {
            OperationRequest::Create => "creation",
            OperationRequest::Update => "update",
            OperationRequest::Delete => "deletion",
        };
        let outcome = match self.status {
            OperationStatus::Succeeded => "succeeded",
            OperationStatus::Failed => "failed",
            OperationStatus::Canceled => "canceled",
            OperationStatus::Pending | OperationStatus::Running => "in progress",
        };
        format!("Resource {verb} {outcome}")
    }

    /// Path of the ARM operation status resource for this operation.
    pub fn status_path(&self, location: &str) -> String {
        format!(
            "/subscriptions/{}/providers/{PROVIDER_NAMESPACE}/locations/{location}/hcpOperationStatuses/{}",
            self.subscription_id, self.id
        )
    }

    pub fn to_status_response(&self, location: &str) -> OperationStatusResponse {
        OperationStatusResponse {
            id: self.status_path(location),
            name: self.id.clone(),
            status: self.status,
            start_time: self.start_time,
            end_time: self
                .status
                .is_terminal()
                .then_some(self.last_transition_time),
            error: self.error.clone(),
        }
    }
}

/// Body returned from the operation status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatusResponse {
    pub id: String,
    pub name: String,
    pub status: OperationStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CloudErrorBody>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_describe_transition() {
        let target = ResourceId::provider_resource("sub", "rg", "hcpOpenShiftClusters", "dev");
        let mut operation = OperationDocument::new(target, OperationRequest::Create);
        operation.status = OperationStatus::Succeeded;
        assert_eq!(operation.transition_message(), "Resource creation succeeded");
        operation.request = OperationRequest::Update;
        operation.status = OperationStatus::Failed;
        assert_eq!(operation.transition_message(), "Resource update failed");
    }

    #[test]
    fn status_response_reports_end_time_only_when_terminal() {
        let target = ResourceId::provider_resource("sub", "rg", "hcpOpenShiftClusters", "dev");
        let mut operation = OperationDocument::new(target, OperationRequest::Delete);
        let response = operation.to_status_response("eastus");
        assert!(response.end_time.is_none());
        assert!(response
            .id
            .ends_with(&format!("/locations/eastus/hcpOperationStatuses/{}", operation.id)));

        operation.status = OperationStatus::Canceled;
        assert!(operation.to_status_response("eastus").end_time.is_some());
    }
}
