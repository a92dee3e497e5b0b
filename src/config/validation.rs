//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for structural
//! errors such as a missing upstream, empty or duplicate filter names,
//! malformed URL patterns and `set.header.*` params that are not valid
//! HTTP. Returns a list of [`ValidationError`] values with per-field
//! suggestions.

use axum::http::{HeaderName, HeaderValue};
use url::Url;

use super::model::Config;
use crate::error::ValidationError;
use crate::filter::params::{DUMP_REQUEST_KEY, DUMP_RESPONSE_KEY, SET_HEADER_PREFIX};
use crate::filter::{FilterConfig, UrlPattern};

const ROOT: &str = "(root)";

/// Validate the upstream base URL. Returns `Ok(())` or a human-readable error.
pub fn validate_upstream(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else if parsed.query().is_some() {
                Err("upstream cannot carry a query string".into())
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

/// Validate one `set.header.*` param. Returns `Ok(())` or a human-readable error.
pub fn validate_header_param(header: &str, value: &str) -> Result<(), String> {
    if header.is_empty() {
        return Err("header name cannot be empty".into());
    }
    if header.parse::<HeaderName>().is_err() {
        return Err(format!("'{header}' is not a valid header name"));
    }
    if HeaderValue::from_str(value).is_err() {
        return Err(format!("value of '{header}' is not a valid header value"));
    }
    Ok(())
}

fn error(filter: &str, field: &str, message: String, suggestion: Option<String>) -> ValidationError {
    ValidationError {
        filter: filter.to_string(),
        field: field.to_string(),
        message,
        suggestion,
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(msg) = validate_upstream(&config.upstream) {
        let suggestion = (!config.upstream.contains("://"))
            .then(|| format!("did you mean 'http://{}'?", config.upstream));
        errors.push(error(ROOT, "upstream", msg, suggestion));
    }

    if config.timeout == 0 {
        errors.push(error(
            ROOT,
            "timeout",
            "timeout must be greater than 0".into(),
            None,
        ));
    }

    if config.correlation_header.parse::<HeaderName>().is_err() {
        errors.push(error(
            ROOT,
            "correlation_header",
            format!("'{}' is not a valid header name", config.correlation_header),
            None,
        ));
    }

    if config.filters.is_empty() {
        errors.push(error(
            ROOT,
            "filters",
            "at least one filter must be defined".into(),
            None,
        ));
        return Err(errors);
    }

    let mut seen_names = std::collections::HashSet::new();

    for (i, filter) in config.filters.iter().enumerate() {
        let filter_id = if filter.name.is_empty() {
            format!("filters[{i}]")
        } else {
            filter.name.clone()
        };

        if filter.name.is_empty() {
            errors.push(error(
                &filter_id,
                "name",
                "name cannot be empty".into(),
                None,
            ));
        } else if !seen_names.insert(&filter.name) {
            errors.push(error(
                &filter_id,
                "name",
                "duplicate filter name".into(),
                None,
            ));
        }

        if filter.url_patterns.is_empty() {
            errors.push(error(
                &filter_id,
                "url_patterns",
                "at least one url pattern must be defined".into(),
                Some("use \"/*\" to match every path".into()),
            ));
        }

        for pattern in &filter.url_patterns {
            if let Err(msg) = UrlPattern::parse(pattern) {
                let suggestion = (!pattern.is_empty()
                    && !pattern.starts_with('/')
                    && !pattern.starts_with('*'))
                .then(|| format!("did you mean '/{pattern}'?"));
                errors.push(error(&filter_id, "url_patterns", msg, suggestion));
            }
        }

        for (key, value) in filter.init_params.iter() {
            if let Some(header) = key.strip_prefix(SET_HEADER_PREFIX) {
                if let Err(msg) = validate_header_param(header, value) {
                    errors.push(error(
                        &filter_id,
                        &format!("init_params.{key}"),
                        msg,
                        None,
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  {} filters, {} url patterns, upstream {}\n",
        config.filters.len(),
        config.total_patterns(),
        config.upstream
    )];

    for filter in &config.filters {
        let runtime = FilterConfig::from_init_params(&filter.name, filter.init_params.iter());
        let headers: Vec<&str> = runtime.headers().iter().map(|(k, _)| k.as_str()).collect();
        let dumps: Vec<&str> = [
            (DUMP_REQUEST_KEY, runtime.dump_request()),
            (DUMP_RESPONSE_KEY, runtime.dump_response()),
        ]
        .into_iter()
        .filter_map(|(key, on)| on.then_some(key))
        .collect();

        lines.push(format!(
            "  {}  -> {}",
            filter.name,
            filter.url_patterns.join(", ")
        ));
        lines.push(format!(
            "    headers: {}",
            if headers.is_empty() {
                "none".to_string()
            } else {
                headers.join(", ")
            }
        ));
        lines.push(format!(
            "    dumps:   {}",
            if dumps.is_empty() {
                "none".to_string()
            } else {
                dumps.join(", ")
            }
        ));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
