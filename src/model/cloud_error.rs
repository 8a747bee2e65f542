use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ResourceId;

/// Stable ARM error codes returned by the frontend.
pub mod codes {
    pub const CANCELED: &str = "Canceled";
    pub const CONFLICT: &str = "Conflict";
    pub const INTERNAL_SERVER_ERROR: &str = "InternalServerError";
    pub const INVALID_PARAMETER: &str = "InvalidParameter";
    pub const INVALID_REQUEST_CONTENT: &str = "InvalidRequestContent";
    pub const INVALID_RESOURCE: &str = "InvalidResource";
    pub const INVALID_RESOURCE_TYPE: &str = "InvalidResourceType";
    pub const MULTIPLE_ERRORS_OCCURRED: &str = "MultipleErrorsOccurred";
    pub const NOT_FOUND: &str = "NotFound";
    pub const PARENT_RESOURCE_NOT_FOUND: &str = "ParentResourceNotFound";
    pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFound";
    pub const SERVICE_UNAVAILABLE: &str = "ServiceUnavailable";
    pub const UNSUPPORTED_API_VERSION: &str = "UnsupportedApiVersion";
}

/// Body of an ARM error; nests recursively through `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<CloudErrorBody>,
}

impl CloudErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            target: None,
            details: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

impl fmt::Display for CloudErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code={}", self.code)?;
        if let Some(target) = &self.target {
            write!(f, "; target={target}")?;
        }
        write!(f, "; message={}", self.message)?;
        if !self.details.is_empty() {
            write!(f, "; details: {}", self.details.iter().join(", "))?;
        }
        Ok(())
    }
}

/// ARM error envelope: `{"error": {...}}` plus the HTTP status it travels with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudError {
    #[serde(skip, default = "internal_status")]
    pub status_code: u16,
    pub error: CloudErrorBody,
}

fn internal_status() -> u16 {
    500
}

impl CloudError {
    pub fn new(
        status_code: u16,
        code: &str,
        target: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut error = CloudErrorBody::new(code, message);
        error.target = target;
        Self { status_code, error }
    }

    pub fn internal_server_error() -> Self {
        Self::new(500, codes::INTERNAL_SERVER_ERROR, None, "Internal server error.")
    }

    pub fn service_unavailable() -> Self {
        Self::new(
            503,
            codes::SERVICE_UNAVAILABLE,
            None,
            "The service is temporarily unavailable. Please retry the request.",
        )
    }

    pub fn invalid_request_content(message: impl Into<String>) -> Self {
        Self::new(400, codes::INVALID_REQUEST_CONTENT, None, message)
    }

    pub fn invalid_parameter(target: &str, message: impl Into<String>) -> Self {
        Self::new(400, codes::INVALID_PARAMETER, Some(target.to_string()), message)
    }

    pub fn unsupported_api_version(api_version: &str) -> Self {
        Self::new(
            400,
            codes::UNSUPPORTED_API_VERSION,
            Some("api-version".to_string()),
            format!("The API version '{api_version}' is not supported."),
        )
    }

    pub fn resource_not_found(id: &ResourceId) -> Self {
        let resource_type = id.resource_type().unwrap_or_default();
        let name = id.name().unwrap_or_default();
        let message = match id.resource_group() {
            Some(group) => format!(
                "The resource '{resource_type}/{name}' under resource group '{group}' was not found."
            ),
            None => format!("The resource '{resource_type}/{name}' was not found."),
        };
        Self::new(404, codes::RESOURCE_NOT_FOUND, Some(id.to_string()), message)
    }

    pub fn parent_resource_not_found(parent: &ResourceId) -> Self {
        Self::new(
            404,
            codes::PARENT_RESOURCE_NOT_FOUND,
            Some(parent.to_string()),
            format!("The parent resource '{parent}' was not found."),
        )
    }

    pub fn operation_not_found(operation_id: &str) -> Self {
        Self::new(
            404,
            codes::NOT_FOUND,
            Some(operation_id.to_string()),
            format!("The operation '{operation_id}' was not found."),
        )
    }

    pub fn conflict(target: Option<String>, message: impl Into<String>) -> Self {
        Self::new(409, codes::CONFLICT, target, message)
    }

    /// Collapse validation findings into a single 400 error.
    ///
    /// A single finding is promoted to the top level; several are wrapped in
    /// `MultipleErrorsOccurred`. Returns `None` when there is nothing to report.
    pub fn content_validation(mut details: Vec<CloudErrorBody>) -> Option<Self> {
        match details.len() {
            0 => None,
            1 => details.pop().map(|error| Self {
                status_code: 400,
                error,
            }),
            _ => {
                let mut error = CloudErrorBody::new(
                    codes::MULTIPLE_ERRORS_OCCURRED,
                    "Content validation failed on multiple fields",
                );
                error.details = details;
                Some(Self {
                    status_code: 400,
                    error,
                })
            }
        }
    }
}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.status_code)
    }
}

impl std::error::Error for CloudError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_validation_detail_is_promoted() {
        let detail = CloudErrorBody::new(codes::INVALID_REQUEST_CONTENT, "bad cidr")
            .with_target("properties.network.podCidr");
        let error = CloudError::content_validation(vec![detail.clone()]).unwrap();
        assert_eq!(error.status_code, 400);
        assert_eq!(error.error, detail);
    }

    #[test]
    fn several_details_become_multiple_errors() {
        let error = CloudError::content_validation(vec![
            CloudErrorBody::new(codes::INVALID_REQUEST_CONTENT, "a"),
            CloudErrorBody::new(codes::INVALID_REQUEST_CONTENT, "b"),
        ])
        .unwrap();
        assert_eq!(error.error.code, codes::MULTIPLE_ERRORS_OCCURRED);
        assert_eq!(error.error.details.len(), 2);
        assert!(CloudError::content_validation(Vec::new()).is_none());
    }

    #[test]
    fn serializes_as_arm_envelope() {
        let error = CloudError::internal_server_error();
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": {"code": "InternalServerError", "message": "Internal server error."}
            })
        );
    }

    #[test]
    fn not_found_message_names_resource_group() {
        let id = ResourceId::provider_resource("sub", "rg", "hcpOpenShiftClusters", "dev");
        let error = CloudError::resource_not_found(&id);
        assert_eq!(
            error.error.message,
            "The resource 'Microsoft.RedHatOpenShift/hcpOpenShiftClusters/dev' under resource group 'rg' was not found."
        );
    }
}
