//! Header rewriting per route policy.
//!
//! Names or values that fail HTTP validation are skipped rather than
//! failing the request.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::routing::route::HeaderRewritePolicy;

/// Apply `add_request` / `remove_request` to the outbound request headers.
pub fn apply_request(headers: &mut HeaderMap, policy: &HeaderRewritePolicy) {
    rewrite(headers, &policy.add_request, &policy.remove_request);
}

/// Apply `add_response` / `remove_response` to the response headers.
pub fn apply_response(headers: &mut HeaderMap, policy: &HeaderRewritePolicy) {
    rewrite(headers, &policy.add_response, &policy.remove_response);
}

fn rewrite(
    headers: &mut HeaderMap,
    add: &std::collections::HashMap<String, String>,
    remove: &[String],
) {
    for (name, value) in add {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!(header = %name, "skipping invalid header rewrite"),
        }
    }

    for name in remove {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            headers.remove(name);
        }
    }
}
