//! Hop-by-hop handling and the headers sent upstream.

use axum::http::header::{
    CONNECTION, CONTENT_LENGTH, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER,
    TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

const HOP_BY_HOP: [HeaderName; 8] = [
    CONNECTION,
    KEEP_ALIVE,
    TRANSFER_ENCODING,
    TE,
    TRAILER,
    UPGRADE,
    PROXY_AUTHORIZATION,
    PROXY_AUTHENTICATE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Prepare an upstream response for re-sending.
///
/// The body is already buffered, so the origin's framing headers no longer
/// apply; axum recomputes `content-length`.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    strip_hop_by_hop(headers);
    headers.remove(CONTENT_LENGTH);
}

/// Client headers minus hop-by-hop ones, with `Host` pointed at the
/// upstream, the client appended to `X-Forwarded-For` and the correlation
/// id under `correlation_header`.
pub fn build_upstream_headers(
    original: &HeaderMap,
    client_ip: &str,
    upstream: &url::Url,
    correlation_header: &HeaderName,
    correlation_id: &str,
) -> HeaderMap {
    let mut headers = original.clone();
    strip_hop_by_hop(&mut headers);

    if let Some(host) = upstream.host_str() {
        let authority = match upstream.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&authority) {
            headers.insert(HOST, value);
        }
    }

    let chain = match original.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing}, {client_ip}"),
        None => client_ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    match HeaderValue::from_str(correlation_id) {
        Ok(value) => {
            headers.insert(correlation_header.clone(), value);
        }
        Err(_) => tracing::warn!(
            correlation_id = %correlation_id,
            "correlation id is not a valid header value, not forwarding it"
        ),
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream_headers(original: &HeaderMap, upstream: &str) -> HeaderMap {
        let upstream = url::Url::parse(upstream).unwrap();
        build_upstream_headers(
            original,
            "10.0.0.1",
            &upstream,
            &HeaderName::from_static("x-request-id"),
            "cid-7",
        )
    }

    #[test]
    fn drops_hop_by_hop_and_keeps_the_rest() {
        let mut original = HeaderMap::new();
        original.insert(CONNECTION, "keep-alive".parse().unwrap());
        original.insert(KEEP_ALIVE, "timeout=5".parse().unwrap());
        original.insert("accept", "text/xml".parse().unwrap());

        let headers = upstream_headers(&original, "http://backend:8080");

        assert!(headers.get(CONNECTION).is_none());
        assert!(headers.get(KEEP_ALIVE).is_none());
        assert_eq!(headers.get("accept").unwrap(), "text/xml");
    }

    #[test]
    fn host_points_at_upstream() {
        let mut original = HeaderMap::new();
        original.insert(HOST, "public.example.com".parse().unwrap());

        let headers = upstream_headers(&original, "http://backend:9090/app");
        assert_eq!(headers.get(HOST).unwrap(), "backend:9090");

        let headers = upstream_headers(&original, "https://backend/app");
        assert_eq!(headers.get(HOST).unwrap(), "backend");
    }

    #[test]
    fn forwarded_for_chain_grows() {
        let headers = upstream_headers(&HeaderMap::new(), "http://backend");
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "10.0.0.1");

        let mut original = HeaderMap::new();
        original.insert(X_FORWARDED_FOR, "1.2.3.4".parse().unwrap());
        let headers = upstream_headers(&original, "http://backend");
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "1.2.3.4, 10.0.0.1");
    }

    #[test]
    fn correlation_id_replaces_client_value() {
        let mut original = HeaderMap::new();
        original.insert("x-request-id", "stale".parse().unwrap());

        let headers = upstream_headers(&original, "http://backend");

        assert_eq!(headers.get_all("x-request-id").iter().count(), 1);
        assert_eq!(headers.get("x-request-id").unwrap(), "cid-7");
    }

    #[test]
    fn response_loses_framing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert(CONTENT_LENGTH, "12".parse().unwrap());
        headers.insert("content-type", "text/xml".parse().unwrap());

        strip_response_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("content-type").unwrap(), "text/xml");
    }
}
