use crate::error::Fault;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Header carrying the caller's credential.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Header carrying the advisory deadline the server applies to the call.
pub const TIMEOUT_HEADER: &str = "grpc-timeout";

// gRPC limits a timeout value to eight digits.
const MAX_TIMEOUT_VALUE: u128 = 99_999_999;

/// Builds the header set sent with every simulation call.
///
/// The token is marked sensitive so that it is never printed by `Debug`
/// output of the header map.
pub fn simulation_headers(auth_token: &str, timeout: Duration) -> Result<HeaderMap, Fault> {
    let mut token = HeaderValue::from_str(auth_token).map_err(|_| {
        Fault::InvalidHeader(
            "the auth token contains characters not allowed in an HTTP header".to_string(),
        )
    })?;
    token.set_sensitive(true);

    let timeout = HeaderValue::from_str(&format_timeout(timeout))
        .map_err(|e| Fault::InvalidHeader(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(HeaderName::from_static(AUTH_TOKEN_HEADER), token);
    headers.insert(HeaderName::from_static(TIMEOUT_HEADER), timeout);
    Ok(headers)
}

/// Renders a duration in gRPC timeout notation: `"10S"` for whole seconds,
/// `"1500m"` for anything with a millisecond part.
pub fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_nanos() == 0 {
        let secs = u128::from(timeout.as_secs()).min(MAX_TIMEOUT_VALUE);
        return format!("{}S", secs);
    }
    let millis = timeout.as_millis().max(1);
    if millis <= MAX_TIMEOUT_VALUE {
        format!("{}m", millis)
    } else {
        // Round up so the server never sees a shorter deadline than asked for.
        let secs = (u128::from(timeout.as_secs()) + 1).min(MAX_TIMEOUT_VALUE);
        format!("{}S", secs)
    }
}
