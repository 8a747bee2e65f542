use serde::{Deserialize, Serialize};

use crate::model::SystemData;

/// ARM request metadata carried from the HTTP layer into mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RequestContext {
    pub client_request_id: Option<String>,
    pub correlation_request_id: Option<String>,
    /// Parsed `x-ms-arm-resource-system-data` header.
    pub system_data: Option<SystemData>,
    /// Absolute URL of the original request, used to build polling URLs.
    pub referer: Option<String>,
}

impl RequestContext {
    pub fn with_ids(
        client_request_id: Option<String>,
        correlation_request_id: Option<String>,
    ) -> Self {
        Self {
            client_request_id,
            correlation_request_id,
            ..Self::default()
        }
    }

    /// Scheme and authority of the referer, if the header was sent.
    pub fn base_url(&self) -> Option<&str> {
        let referer = self.referer.as_deref()?;
        let after_scheme = referer.find("://")? + 3;
        let end = referer[after_scheme..]
            .find('/')
            .map(|offset| after_scheme + offset)
            .unwrap_or(referer.len());
        Some(&referer[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_strips_path() {
        let ctx = RequestContext {
            referer: Some("https://management.azure.com/subscriptions/s?api-version=1".into()),
            ..RequestContext::default()
        };
        assert_eq!(ctx.base_url(), Some("https://management.azure.com"));
        assert_eq!(RequestContext::default().base_url(), None);
    }
}
