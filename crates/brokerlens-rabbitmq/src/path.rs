use crate::error::{RabbitError, Result};

/// Encode a vhost as a single management API path segment.
///
/// The default vhost `/` becomes `%2F`. An empty vhost is rejected before
/// any request is built.
pub fn encode_vhost(vhost: &str) -> Result<String> {
    if vhost.is_empty() {
        return Err(RabbitError::EmptyVhost);
    }
    if vhost == "/" {
        return Ok("%2F".to_string());
    }
    Ok(encode_segment(vhost))
}

/// Percent-encode a queue, exchange or binding path segment.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
