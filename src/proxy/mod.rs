//! Upstream forwarding handler.
//!
//! [`forward_handler`] is the Axum fallback behind the header filter: it
//! sends every non-`/health` request to the configured upstream and
//! returns the upstream response. Upstream failures become
//! `502 Bad Gateway` here, before the filter post-processes the response.

pub mod headers;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use http_body_util::{BodyExt, Full};

use crate::error::HeaderFilterError;
use crate::filter::CorrelationId;
use crate::server::AppState;

/// Upstream URL for an incoming request: the base joined with the
/// original path and query.
#[must_use]
pub fn upstream_url(base: &url::Url, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!(
        "{}{}",
        base.as_str().trim_end_matches('/'),
        path_and_query
    )
}

#[allow(clippy::significant_drop_tightening)]
pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    correlation: Option<Extension<CorrelationId>>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = correlation.map_or_else(
        || uuid::Uuid::new_v4().to_string(),
        |Extension(id)| id.0,
    );
    let target = upstream_url(&state.upstream, &uri);

    let forwarded = headers::build_upstream_headers(
        &req_headers,
        &addr.ip().to_string(),
        &state.upstream,
        &state.correlation_header,
        &correlation_id,
    );

    let start = Instant::now();
    match forward(&state, method.clone(), &target, forwarded, body).await {
        Ok((status, mut resp_headers, body_bytes)) => {
            state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                correlation_id = %correlation_id,
                method = %method,
                path = %uri.path(),
                status = status.as_u16(),
                latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                "request forwarded"
            );
            headers::strip_response_hop_by_hop(&mut resp_headers);
            let mut builder = Response::builder().status(status);
            for (key, value) in &resp_headers {
                builder = builder.header(key, value);
            }
            builder
                .body(axum::body::Body::from(body_bytes))
                .unwrap_or_else(|e| {
                    tracing::error!(
                        correlation_id = %correlation_id,
                        error = %e,
                        "failed to build response"
                    );
                    StatusCode::BAD_GATEWAY.into_response()
                })
        }
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                correlation_id = %correlation_id,
                upstream = %target,
                error = %e,
                "upstream request failed"
            );
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

async fn forward(
    state: &AppState,
    method: Method,
    target: &str,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, HeaderMap, Bytes), HeaderFilterError> {
    let mut builder = hyper::Request::builder().method(method).uri(target);
    for (key, value) in &headers {
        builder = builder.header(key, value);
    }
    let req = builder
        .body(Full::new(body))
        .map_err(|e| HeaderFilterError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(state.timeout, state.http_client.request(req))
        .await
        .map_err(|_| HeaderFilterError::HttpRequest {
            source: "upstream request timed out".into(),
        })?
        .map_err(|e| HeaderFilterError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    let resp_headers = response.headers().clone();
    let body_bytes = response
        .into_body()
        .collect()
        .await
        .map_err(|e| HeaderFilterError::HttpRequest {
            source: Box::new(e),
        })?
        .to_bytes();

    Ok((status, resp_headers, body_bytes))
}
