use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header, request::Parts, HeaderMap},
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::api::AppState;
use crate::convert::ApiVersion;
use crate::error::FrontendError;
use crate::model::{CloudError, RequestContext, SystemData};
use crate::store::Store;

pub const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";
pub const CORRELATION_REQUEST_ID: &str = "x-ms-correlation-request-id";
pub const SYSTEM_DATA: &str = "x-ms-arm-resource-system-data";

/// ARM request metadata from the request headers.
///
/// Every header is optional; requests that do not come through ARM simply
/// produce an empty context.
#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        let mut ctx = RequestContext::with_ids(
            extract_header_value(headers, CLIENT_REQUEST_ID),
            extract_header_value(headers, CORRELATION_REQUEST_ID),
        );
        ctx.system_data = extract_header_value(headers, SYSTEM_DATA).and_then(|raw| {
            serde_json::from_str::<SystemData>(&raw)
                .map_err(|err| log::warn!("ignoring malformed {SYSTEM_DATA} header: {err}"))
                .ok()
        });
        ctx.referer = extract_header_value(headers, header::REFERER.as_str());

        Ok(ctx)
    }
}

/// Extract header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}

#[derive(Debug, Deserialize)]
struct ApiVersionQuery {
    #[serde(rename = "api-version")]
    api_version: Option<String>,
}

/// The API version named by the `api-version` query parameter.
pub struct RequestedVersion(pub Arc<dyn ApiVersion>);

#[async_trait]
impl<S: Store> FromRequestParts<AppState<S>> for RequestedVersion {
    type Rejection = FrontendError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let requested = Query::<ApiVersionQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.api_version)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                CloudError::invalid_parameter(
                    "api-version",
                    "The api-version query parameter is required",
                )
            })?;

        state
            .versions
            .get(&requested)
            .map(RequestedVersion)
            .ok_or_else(|| CloudError::unsupported_api_version(&requested).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue, Request};

    #[test]
    fn test_header_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(CLIENT_REQUEST_ID),
            HeaderValue::from_static("client-1"),
        );

        assert_eq!(
            extract_header_value(&headers, CLIENT_REQUEST_ID),
            Some("client-1".to_string())
        );
        assert_eq!(extract_header_value(&headers, CORRELATION_REQUEST_ID), None);
    }

    #[tokio::test]
    async fn test_context_from_headers() {
        let request = Request::builder()
            .uri("/subscriptions/s?api-version=2024-06-10-preview")
            .header(CORRELATION_REQUEST_ID, "corr-1")
            .header(SYSTEM_DATA, r#"{"createdBy":"alice","createdByType":"User"}"#)
            .header("referer", "https://management.azure.com/subscriptions/s")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.correlation_request_id.as_deref(), Some("corr-1"));
        assert_eq!(ctx.client_request_id, None);
        assert_eq!(
            ctx.system_data
                .as_ref()
                .and_then(|data| data.created_by.as_deref()),
            Some("alice")
        );
        assert_eq!(ctx.base_url(), Some("https://management.azure.com"));
    }

    #[tokio::test]
    async fn test_malformed_system_data_is_ignored() {
        let request = Request::builder()
            .header(SYSTEM_DATA, "not json")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(ctx.system_data.is_none());
    }
}
