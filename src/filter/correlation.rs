//! Correlation id resolution.

use http::{HeaderName, Request};

/// Correlation id of the current request.
///
/// An outer layer may insert this extension to hand its id to the filter.
/// The filter inserts it too, so inner services see the id it logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reuse the upstream id when one is present and non-empty, else mint a
/// UUID v4.
///
/// The [`CorrelationId`] extension is checked before `header`.
pub fn resolve<B>(req: &Request<B>, header: &HeaderName) -> String {
    let from_extension = req
        .extensions()
        .get::<CorrelationId>()
        .map(|id| id.0.trim())
        .filter(|id| !id.is_empty());

    from_extension
        .or_else(|| {
            req.headers()
                .get(header)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|id| !id.is_empty())
        })
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> HeaderName {
        HeaderName::from_static("x-correlation-id")
    }

    #[test]
    fn reuses_header_id() {
        let req = Request::builder()
            .header("x-correlation-id", "abc-123")
            .body(())
            .unwrap();
        assert_eq!(resolve(&req, &header()), "abc-123");
    }

    #[test]
    fn extension_takes_precedence() {
        let mut req = Request::builder()
            .header("x-correlation-id", "from-header")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(CorrelationId("from-extension".into()));
        assert_eq!(resolve(&req, &header()), "from-extension");
    }

    #[test]
    fn empty_ids_are_replaced() {
        let mut req = Request::builder()
            .header("x-correlation-id", "")
            .body(())
            .unwrap();
        req.extensions_mut().insert(CorrelationId(String::new()));
        let id = resolve(&req, &header());
        assert_eq!(id.len(), 36);
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn empty_extension_falls_back_to_header() {
        let mut req = Request::builder()
            .header("x-correlation-id", "from-header")
            .body(())
            .unwrap();
        req.extensions_mut().insert(CorrelationId("  ".into()));
        assert_eq!(resolve(&req, &header()), "from-header");
    }

    #[test]
    fn generated_ids_are_v4_and_unique() {
        let req = Request::new(());
        let a = resolve(&req, &header());
        let b = resolve(&req, &header());
        assert_ne!(a, b);
        assert_eq!(uuid::Uuid::parse_str(&a).unwrap().get_version_num(), 4);
    }
}
