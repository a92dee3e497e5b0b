//! Response header post-processing.
//!
//! - [`inject_missing`] adds configured headers the response lacks.
//! - [`default_character_encoding`] records UTF-8 as the encoding when
//!   none was declared.
//! - [`normalize_xml_content_type`] appends `; charset=utf-8` to a bare
//!   `application/xml` or `text/xml` content type.

use std::borrow::Cow;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Response};

/// Declared character encoding of a response body.
///
/// Stored as a response extension. It is independent of the
/// `Content-Type` header, which is only touched for XML types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterEncoding(pub Cow<'static, str>);

impl CharacterEncoding {
    pub const UTF_8: Self = Self(Cow::Borrowed("UTF-8"));

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const XML_CONTENT_TYPES: &[&str] = &["application/xml", "text/xml"];
const XML_CHARSET_SUFFIX: &str = "; charset=utf-8";

/// Add each configured header that is absent from `headers`.
///
/// Headers already present are left alone, whatever their value. Returns
/// the number of headers added.
pub fn inject_missing(
    headers: &mut HeaderMap,
    rules: &[(HeaderName, HeaderValue)],
    correlation_id: &str,
) -> usize {
    let mut added = 0;

    for (name, value) in rules {
        if headers.contains_key(name) {
            continue;
        }
        tracing::debug!(
            correlation_id = %correlation_id,
            header = %name,
            value = ?value,
            "adding header"
        );
        headers.append(name.clone(), value.clone());
        added += 1;
    }

    added
}

/// Charset parameter of a `Content-Type` value, if any.
#[must_use]
pub fn content_type_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
    })
}

/// Declared character encoding: the [`CharacterEncoding`] extension, or
/// else the charset parameter of `Content-Type`.
#[must_use]
pub fn character_encoding<B>(response: &Response<B>) -> Option<&str> {
    if let Some(encoding) = response.extensions().get::<CharacterEncoding>() {
        return Some(encoding.as_str());
    }
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(content_type_charset)
}

/// Record UTF-8 as the response encoding when none is declared.
///
/// Returns `true` when the default was applied.
pub fn default_character_encoding<B>(response: &mut Response<B>) -> bool {
    if character_encoding(response).is_some() {
        return false;
    }
    response.extensions_mut().insert(CharacterEncoding::UTF_8);
    true
}

/// Append `; charset=utf-8` to a bare XML `Content-Type`.
///
/// Only the exact values `application/xml` and `text/xml` (ASCII
/// case-insensitive) qualify. The header is replaced in place. Returns
/// `true` when the value changed.
pub fn normalize_xml_content_type(headers: &mut HeaderMap) -> bool {
    let Some(current) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let is_xml = XML_CONTENT_TYPES
        .iter()
        .any(|xml| current.eq_ignore_ascii_case(xml));
    if !is_xml || current.to_ascii_lowercase().contains("charset") {
        return false;
    }

    match HeaderValue::from_str(&format!("{current}{XML_CHARSET_SUFFIX}")) {
        Ok(value) => {
            headers.insert(CONTENT_TYPE, value);
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to build xml content-type");
            false
        }
    }
}
