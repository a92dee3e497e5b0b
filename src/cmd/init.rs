//! `header-filter init` - generate a starter configuration file.
//!
//! Creates a YAML, JSON, or TOML config file with either minimal
//! or fully documented templates.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::HeaderFilterError;

pub fn execute(args: &InitArgs) -> Result<(), HeaderFilterError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("header-filter.{}", args.format.extension())));

    if output.exists() {
        return Err(HeaderFilterError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

#[must_use]
pub const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# header-filter config

upstream: "http://localhost:8080"

filters:
  - name: "default-headers"
    url_patterns: ["/*"]
    init_params:
      set.header.X-Content-Type-Options: "nosniff"
"#;

const YAML_FULL: &str = r#"# header-filter config
#
# All optional values shown are defaults. Uncomment and modify as needed.

# Base URL every request is forwarded to
upstream: "http://localhost:8080"

# timeout: 5000                          # Upstream timeout in ms
# correlation_header: "x-correlation-id" # Header carrying an upstream correlation id
# dump_target: log                       # log (tracing events) | stdout (plain lines)

filters:
  # Each filter applies to the paths its url_patterns match. When several
  # filters match, the most specific pattern wins:
  #   exact (/a/b) > longest prefix (/a/*) > extension (*.xml) > catch-all (/*) > default (/)
  # Equal matches go to the filter declared first.
  - name: "default-headers"
    url_patterns: ["/*"]
    init_params:
      # set.header.<Name>: value is added when the response lacks <Name>
      set.header.X-Content-Type-Options: "nosniff"
      set.header.X-Frame-Options: "DENY"
      # dump.request / dump.response: "true" logs every header
      # dump.request: "true"
      # dump.response: "true"

  # - name: "api-headers"
  #   url_patterns: ["/api/*", "*.xml"]
  #   init_params:
  #     set.header.Cache-Control: "no-store"
  #     dump.response: "true"
"#;

const JSON_MINIMAL: &str = r#"{
  "upstream": "http://localhost:8080",
  "filters": [
    {
      "name": "default-headers",
      "url_patterns": ["/*"],
      "init_params": {
        "set.header.X-Content-Type-Options": "nosniff"
      }
    }
  ]
}
"#;

const JSON_FULL: &str = r#"{
  "upstream": "http://localhost:8080",
  "timeout": 5000,
  "correlation_header": "x-correlation-id",
  "dump_target": "log",
  "filters": [
    {
      "name": "default-headers",
      "url_patterns": ["/*"],
      "init_params": {
        "set.header.X-Content-Type-Options": "nosniff",
        "set.header.X-Frame-Options": "DENY",
        "dump.request": "false",
        "dump.response": "false"
      }
    }
  ]
}
"#;

const TOML_MINIMAL: &str = r#"# header-filter config

upstream = "http://localhost:8080"

[[filters]]
name = "default-headers"
url_patterns = ["/*"]

[filters.init_params]
"set.header.X-Content-Type-Options" = "nosniff"
"#;

const TOML_FULL: &str = r#"# header-filter config
#
# All optional values shown are defaults. Uncomment and modify as needed.

upstream = "http://localhost:8080"
# timeout = 5000
# correlation_header = "x-correlation-id"
# dump_target = "log"

[[filters]]
name = "default-headers"
url_patterns = ["/*"]

[filters.init_params]
"set.header.X-Content-Type-Options" = "nosniff"
"set.header.X-Frame-Options" = "DENY"
# "dump.request" = "true"
# "dump.response" = "true"
"#;
