//! Integration tests for config loading across all file formats.

use header_filter::config::model::{Config, DumpTarget};
use header_filter::config::sources::{self, parse_config_str};
use header_filter::config::validation::validate;
use header_filter::error::HeaderFilterError;
use header_filter::filter::FilterRegistry;

fn load_example(name: &str) -> String {
    let path = format!("example/{name}");
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

#[test]
fn yaml_example_loads_and_validates() {
    let content = load_example("header-filter.yaml");
    let config = parse_config_str("yaml", &content, "header-filter.yaml").unwrap();
    validate(&config).unwrap();
    assert_eq!(config.filters.len(), 1);
    assert_eq!(config.total_patterns(), 1);
}

#[test]
fn yaml_full_example_loads_and_validates() {
    let content = load_example("full.yaml");
    let config = parse_config_str("yaml", &content, "full.yaml").unwrap();
    validate(&config).unwrap();
    assert_eq!(config.filters.len(), 3);
    assert_eq!(config.timeout, 2000);
    assert_eq!(config.correlation_header, "x-request-id");
    assert_eq!(config.dump_target, DumpTarget::Stdout);

    let api = &config.filters[1];
    assert_eq!(api.init_params.get("dump.request"), Some("true"));
}

#[test]
fn full_example_resolves_filters_by_path() {
    let content = load_example("full.yaml");
    let config = parse_config_str("yaml", &content, "full.yaml").unwrap();
    let registry = FilterRegistry::new(config.registrations());

    let api = registry.resolve("/api/orders").unwrap();
    assert_eq!(api.name(), "api");
    assert!(api.dump_request());
    assert!(api.dump_response());

    let feed = registry.resolve("/news/today.xml").unwrap();
    assert_eq!(feed.name(), "feeds");
    assert!(!feed.dump_request());

    // "/rss" is exact and beats the catch-all.
    assert_eq!(registry.resolve("/rss").unwrap().name(), "feeds");
    assert_eq!(registry.resolve("/index.html").unwrap().name(), "security-headers");
    // Prefix "/api/*" beats extension "*.xml".
    assert_eq!(registry.resolve("/api/feed.xml").unwrap().name(), "api");
}

#[cfg(feature = "json")]
#[test]
fn json_example_loads_and_validates() {
    let content = load_example("header-filter.json");
    let config = parse_config_str("json", &content, "header-filter.json").unwrap();
    validate(&config).unwrap();
    assert!(!config.filters.is_empty());
}

#[cfg(feature = "toml")]
#[test]
fn toml_example_loads_and_validates() {
    let content = load_example("header-filter.toml");
    let config = parse_config_str("toml", &content, "header-filter.toml").unwrap();
    validate(&config).unwrap();
    assert!(!config.filters.is_empty());
}

#[cfg(all(feature = "json", feature = "toml"))]
#[test]
fn all_formats_produce_equivalent_configs() {
    let yaml_config =
        parse_config_str("yaml", &load_example("header-filter.yaml"), "yaml").unwrap();
    let json_config =
        parse_config_str("json", &load_example("header-filter.json"), "json").unwrap();
    let toml_config =
        parse_config_str("toml", &load_example("header-filter.toml"), "toml").unwrap();

    assert_eq!(yaml_config.filters.len(), json_config.filters.len());
    assert_eq!(yaml_config.filters.len(), toml_config.filters.len());
    assert_eq!(yaml_config.upstream, json_config.upstream);
    assert_eq!(yaml_config.upstream, toml_config.upstream);
    assert_eq!(
        yaml_config.filters[0].init_params.get("set.header.X-Frame-Options"),
        toml_config.filters[0].init_params.get("set.header.X-Frame-Options")
    );
}

#[test]
fn unsupported_format_returns_error() {
    let result = parse_config_str("xml", "{}", "test.xml");
    assert!(matches!(result, Err(HeaderFilterError::UnsupportedFormat(ext)) if ext == "xml"));
}

#[test]
fn invalid_config_fails_validation() {
    let empty = r#"{"upstream": "http://localhost:8080", "filters": []}"#;
    let config: Config = serde_json::from_str(empty).unwrap();
    assert!(validate(&config).is_err());
}

#[tokio::test]
async fn file_source_loads_and_validates() {
    let source = sources::for_path(std::path::Path::new("example/header-filter.yaml")).unwrap();
    assert_eq!(source.name(), "yaml");
    let config = source.load().await.unwrap();
    assert_eq!(config.filters[0].name, "security-headers");
}

#[tokio::test]
async fn missing_file_is_reported() {
    let source = sources::for_path(std::path::Path::new("example/does-not-exist.yaml")).unwrap();
    let result = source.load().await;
    assert!(matches!(
        result,
        Err(HeaderFilterError::ConfigFileNotFound { .. })
    ));
}
