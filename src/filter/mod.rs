//! The response header filter as a tower [`Layer`] / [`Service`].
//!
//! [`HeaderFilterLayer`] wraps any inner service returning
//! `http::Response<B>`. For every request the [`HeaderFilter`] service:
//!
//! 1. resolves a correlation id ([`correlation`]),
//! 2. picks the filter registration for the request path ([`routing`]),
//! 3. optionally dumps the request ([`dump`]),
//! 4. awaits the inner service, swallowing errors and panics,
//! 5. injects missing headers and normalizes the encoding ([`headers`]),
//! 6. optionally dumps the response.
//!
//! Nothing the filter does can fail the request: every fallible step is
//! logged and processing moves on to the next one.

pub mod correlation;
pub mod dump;
pub mod headers;
pub mod params;
pub mod routing;

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::{HeaderName, Request, Response};
use tower::{Layer, Service, ServiceExt};

pub use correlation::CorrelationId;
pub use dump::{Dump, DumpKind, DumpSink, LogSink, StdoutSink};
pub use headers::CharacterEncoding;
pub use params::FilterConfig;
pub use routing::{PatternTable, UrlPattern};

use dump::RequestClock;

pub const DEFAULT_CORRELATION_HEADER: &str = "x-correlation-id";

/// One named filter: its init params and the URL patterns it applies to.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistration {
    pub name: String,
    pub url_patterns: Vec<String>,
    pub init_params: Vec<(String, String)>,
}

/// All filter configurations plus the pattern table that selects one per
/// request path. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: Vec<FilterConfig>,
    patterns: PatternTable<usize>,
}

impl FilterRegistry {
    /// Build the registry in declaration order.
    ///
    /// Unparseable URL patterns are logged and left out of the table.
    pub fn new<I>(registrations: I) -> Self
    where
        I: IntoIterator<Item = FilterRegistration>,
    {
        let mut registry = Self::default();

        for registration in registrations {
            let idx = registry.filters.len();
            registry.filters.push(FilterConfig::from_init_params(
                &registration.name,
                registration
                    .init_params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            ));

            for pattern in &registration.url_patterns {
                match UrlPattern::parse(pattern) {
                    Ok(parsed) => registry.patterns.insert(parsed, idx),
                    Err(msg) => tracing::warn!(
                        filter = %registration.name,
                        pattern = %pattern,
                        error = %msg,
                        "invalid url pattern, skipping"
                    ),
                }
            }
        }

        registry
    }

    /// Filter configuration applying to `path`, if any.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&FilterConfig> {
        self.patterns
            .resolve(path)
            .and_then(|idx| self.filters.get(*idx))
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterConfig] {
        &self.filters
    }

    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

struct Shared {
    registry: FilterRegistry,
    sink: Arc<dyn DumpSink>,
    correlation_header: HeaderName,
}

#[derive(Clone)]
pub struct HeaderFilterLayer {
    shared: Arc<Shared>,
}

impl fmt::Debug for HeaderFilterLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderFilterLayer")
            .field("filters", &self.shared.registry.filters().len())
            .field("correlation_header", &self.shared.correlation_header)
            .finish_non_exhaustive()
    }
}

impl HeaderFilterLayer {
    /// Layer with [`LogSink`] dumps and the `x-correlation-id` header.
    #[must_use]
    pub fn new(registry: FilterRegistry) -> Self {
        Self::with_options(
            registry,
            Arc::new(LogSink),
            HeaderName::from_static(DEFAULT_CORRELATION_HEADER),
        )
    }

    #[must_use]
    pub fn with_options(
        registry: FilterRegistry,
        sink: Arc<dyn DumpSink>,
        correlation_header: HeaderName,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry,
                sink,
                correlation_header,
            }),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &FilterRegistry {
        &self.shared.registry
    }
}

impl<S> Layer<S> for HeaderFilterLayer {
    type Service = HeaderFilter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HeaderFilter {
            inner,
            shared: Arc::clone(&self.shared),
        }
    }
}

#[derive(Clone)]
pub struct HeaderFilter<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S: fmt::Debug> fmt::Debug for HeaderFilter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderFilter")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for HeaderFilter<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: fmt::Display + Send,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Infallible>>;

    // Inner readiness is awaited inside `call` so its errors are swallowed
    // like any other inner failure.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let shared = Arc::clone(&self.shared);

        Box::pin(async move {
            let correlation_id = correlation::resolve(&req, &shared.correlation_header);
            let clock = RequestClock::start();
            req.extensions_mut()
                .insert(CorrelationId(correlation_id.clone()));

            let filter = shared.registry.resolve(req.uri().path());

            if filter.is_some_and(FilterConfig::dump_request) {
                emit(&*shared.sink, &Dump::request(&correlation_id, &clock, &req));
            }

            let mut response = call_inner(inner, req, &correlation_id).await;

            if let Some(filter) = filter {
                headers::inject_missing(response.headers_mut(), filter.headers(), &correlation_id);
            }
            headers::default_character_encoding(&mut response);
            headers::normalize_xml_content_type(response.headers_mut());

            if filter.is_some_and(FilterConfig::dump_response) {
                emit(&*shared.sink, &Dump::response(&correlation_id, &clock, &response));
            }

            Ok(response)
        })
    }
}

/// Await the inner service. Errors and panics yield an empty `200` response.
async fn call_inner<S, ReqBody, ResBody>(
    mut inner: S,
    req: Request<ReqBody>,
    correlation_id: &str,
) -> Response<ResBody>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: fmt::Display,
    ResBody: Default,
{
    let outcome = AssertUnwindSafe(async move { inner.ready().await?.call(req).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(
                correlation_id = %correlation_id,
                error = %e,
                "inner service failed, continuing with an empty response"
            );
            Response::new(ResBody::default())
        }
        Err(panic) => {
            tracing::error!(
                correlation_id = %correlation_id,
                panic = %panic_message(panic.as_ref()),
                "inner service panicked, continuing with an empty response"
            );
            Response::new(ResBody::default())
        }
    }
}

fn emit(sink: &dyn DumpSink, dump: &Dump) {
    if let Err(e) = sink.emit(dump) {
        tracing::warn!(
            correlation_id = %dump.correlation_id(),
            kind = ?dump.kind(),
            error = %e,
            "failed to write dump"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str, patterns: &[&str], params: &[(&str, &str)]) -> FilterRegistration {
        FilterRegistration {
            name: name.into(),
            url_patterns: patterns.iter().map(|p| (*p).to_string()).collect(),
            init_params: params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[test]
    fn registry_resolves_by_specificity() {
        let registry = FilterRegistry::new([
            registration("all", &["/*"], &[("set.header.X-A", "1")]),
            registration("api", &["/api/*"], &[("set.header.X-B", "2")]),
        ]);

        assert_eq!(registry.resolve("/api/users").unwrap().name(), "api");
        assert_eq!(registry.resolve("/home").unwrap().name(), "all");
        assert_eq!(registry.filters().len(), 2);
    }

    #[test]
    fn extension_registration_beats_catch_all() {
        let registry = FilterRegistry::new([
            registration("all", &["/*"], &[("set.header.X-A", "1")]),
            registration("feeds", &["*.xml"], &[("dump.response", "true")]),
        ]);

        let feeds = registry.resolve("/news/today.xml").unwrap();
        assert_eq!(feeds.name(), "feeds");
        assert!(feeds.dump_response());
        assert_eq!(registry.resolve("/news/today").unwrap().name(), "all");
    }

    #[test]
    fn invalid_patterns_are_skipped() {
        let registry = FilterRegistry::new([registration("f", &["nope", "/ok"], &[])]);
        assert_eq!(registry.pattern_count(), 1);
        assert!(registry.resolve("/nope").is_none());
        assert_eq!(registry.resolve("/ok").unwrap().name(), "f");
    }

    #[test]
    fn filter_future_is_send_for_any_inner_error() {
        fn assert_send<T: Send>(_: &T) {}

        let mut svc = HeaderFilterLayer::new(FilterRegistry::default()).layer(
            tower::service_fn(|_req: Request<()>| async {
                Err::<Response<String>, _>(std::io::Error::other("down"))
            }),
        );
        let fut = svc.call(Request::new(()));
        assert_send(&fut);
    }

    #[test]
    fn panic_message_reads_str_and_string() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");
        let s: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(s.as_ref()), "bang");
        let s: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(s.as_ref()), "non-string panic payload");
    }
}
