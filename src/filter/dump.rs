//! Request and response dumps.
//!
//! A [`Dump`] is the rendered list of lines for one request or response,
//! tagged with its correlation id. Where the lines go is decided by a
//! [`DumpSink`]: [`LogSink`] turns each line into a `tracing` event and
//! [`StdoutSink`] prints them under a single stdout lock.

use std::io::Write;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use http::header::HOST;
use http::{HeaderMap, Request, Response};

const REQUEST_TERMINATOR: &str = "=============================";
const RESPONSE_TERMINATOR: &str = "---------------------------------";

/// Start of a request, in both clocks the dumps need.
#[derive(Debug, Clone, Copy)]
pub struct RequestClock {
    started: Instant,
    started_epoch_ms: u128,
}

impl RequestClock {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_epoch_ms: epoch_millis(),
        }
    }

    #[must_use]
    pub const fn started_epoch_ms(&self) -> u128 {
        self.started_epoch_ms
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    Request,
    Response,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dump {
    kind: DumpKind,
    correlation_id: String,
    lines: Vec<String>,
}

impl Dump {
    #[must_use]
    pub fn request<B>(correlation_id: &str, clock: &RequestClock, req: &Request<B>) -> Self {
        let mut lines = vec![
            format!("dumpRequest: Request ID: {correlation_id}"),
            format!("Request Time : {}", clock.started_epoch_ms()),
            format!("Request Method: {}", req.method()),
            format!("Request URL: {}", request_url(req)),
            "Request Headers:".to_string(),
        ];
        push_headers(&mut lines, req.headers());
        lines.push(REQUEST_TERMINATOR.to_string());

        Self {
            kind: DumpKind::Request,
            correlation_id: correlation_id.to_string(),
            lines,
        }
    }

    #[must_use]
    pub fn response<B>(correlation_id: &str, clock: &RequestClock, resp: &Response<B>) -> Self {
        let mut lines = vec![
            format!("dumpResponse: Request ID: {correlation_id}"),
            format!("Response Status Code: {}", resp.status().as_u16()),
            "Response Headers:".to_string(),
        ];
        push_headers(&mut lines, resp.headers());
        lines.push(format!("Response Time : {}", epoch_millis()));
        lines.push(format!("Elapsed Time : {}", clock.elapsed_ms()));
        lines.push(RESPONSE_TERMINATOR.to_string());

        Self {
            kind: DumpKind::Response,
            correlation_id: correlation_id.to_string(),
            lines,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DumpKind {
        self.kind
    }

    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

fn push_headers(lines: &mut Vec<String>, headers: &HeaderMap) {
    for (name, value) in headers {
        lines.push(format!(
            "{name} : {}",
            String::from_utf8_lossy(value.as_bytes())
        ));
    }
}

/// Scheme, authority and path of the request, without the query string.
fn request_url<B>(req: &Request<B>) -> String {
    let uri = req.uri();
    let authority = uri.authority().map(|a| a.as_str()).or_else(|| {
        req.headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
    });

    match authority {
        Some(authority) => {
            let scheme = uri.scheme_str().unwrap_or("http");
            format!("{scheme}://{authority}{}", uri.path())
        }
        None => uri.path().to_string(),
    }
}

/// Destination for rendered dumps.
pub trait DumpSink: Send + Sync {
    fn emit(&self, dump: &Dump) -> std::io::Result<()>;
}

/// Emits every dump line as an `info` event on the `header_filter::dump`
/// target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DumpSink for LogSink {
    fn emit(&self, dump: &Dump) -> std::io::Result<()> {
        for line in dump.lines() {
            tracing::info!(
                target: "header_filter::dump",
                correlation_id = %dump.correlation_id(),
                "{line}"
            );
        }
        Ok(())
    }
}

/// Prints dumps as plain lines on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl DumpSink for StdoutSink {
    fn emit(&self, dump: &Dump) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        for line in dump.lines() {
            writeln!(out, "{line}")?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn request_dump_lists_method_url_and_headers() {
        let req = Request::builder()
            .method("POST")
            .uri("/orders/42?verbose=1")
            .header("host", "example.com:8080")
            .header("accept", "text/xml")
            .body(())
            .unwrap();
        let clock = RequestClock::start();
        let dump = Dump::request("cid-1", &clock, &req);

        assert_eq!(dump.kind(), DumpKind::Request);
        assert_eq!(dump.correlation_id(), "cid-1");
        let lines = dump.lines();
        assert_eq!(lines[0], "dumpRequest: Request ID: cid-1");
        assert_eq!(lines[1], format!("Request Time : {}", clock.started_epoch_ms()));
        assert_eq!(lines[2], "Request Method: POST");
        assert_eq!(lines[3], "Request URL: http://example.com:8080/orders/42");
        assert_eq!(lines[4], "Request Headers:");
        assert_eq!(lines[5], "host : example.com:8080");
        assert_eq!(lines[6], "accept : text/xml");
        assert_eq!(lines.last().unwrap(), REQUEST_TERMINATOR);
    }

    #[test]
    fn absolute_uri_keeps_its_scheme() {
        let req = Request::builder()
            .uri("https://api.example.com/a?b=c")
            .body(())
            .unwrap();
        let dump = Dump::request("id", &RequestClock::start(), &req);
        assert_eq!(dump.lines()[3], "Request URL: https://api.example.com/a");
    }

    #[test]
    fn response_dump_lists_status_headers_and_timing() {
        let resp = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("x-test", "ok")
            .body(())
            .unwrap();
        let dump = Dump::response("cid-2", &RequestClock::start(), &resp);

        let lines = dump.lines();
        assert_eq!(dump.kind(), DumpKind::Response);
        assert_eq!(lines[0], "dumpResponse: Request ID: cid-2");
        assert_eq!(lines[1], "Response Status Code: 404");
        assert_eq!(lines[2], "Response Headers:");
        assert_eq!(lines[3], "x-test : ok");
        assert!(lines[4].starts_with("Response Time : "));
        assert!(lines[5].starts_with("Elapsed Time : "));
        assert_eq!(lines[6], RESPONSE_TERMINATOR);
    }

    #[test]
    fn non_utf8_values_render_lossily() {
        let resp = Response::builder()
            .header("x-bin", http::HeaderValue::from_bytes(b"caf\xe9").unwrap())
            .body(())
            .unwrap();
        let dump = Dump::response("id", &RequestClock::start(), &resp);
        assert_eq!(dump.lines()[3], "x-bin : caf\u{fffd}");
    }
}
