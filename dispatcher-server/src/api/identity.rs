//! Caller identity headers
//!
//! The gateway in front of the dispatcher authenticates callers and forwards
//! the tenant and the calling service as headers.

use axum::http::HeaderMap;

use crate::api::error::{ApiError, ApiResult};

pub const ORG_ID_HEADER: &str = "x-org-id";
pub const SERVICE_HEADER: &str = "x-dispatcher-service";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Tenant every listing is scoped to
pub fn org_id(headers: &HeaderMap) -> ApiResult<String> {
    header(headers, ORG_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", ORG_ID_HEADER)))
}

/// Internal service creating runs; also the admission key
pub fn service(headers: &HeaderMap) -> ApiResult<String> {
    header(headers, SERVICE_HEADER)
        .ok_or_else(|| ApiError::BadRequest(format!("missing {} header", SERVICE_HEADER)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_header_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(ORG_ID_HEADER, "  ".parse().unwrap());
        assert!(matches!(org_id(&headers), Err(ApiError::Unauthorized(_))));

        headers.insert(ORG_ID_HEADER, "5318290".parse().unwrap());
        assert_eq!(org_id(&headers).unwrap(), "5318290");
    }

    #[test]
    fn test_missing_service_is_a_bad_request() {
        assert!(matches!(
            service(&HeaderMap::new()),
            Err(ApiError::BadRequest(_))
        ));
    }
}
