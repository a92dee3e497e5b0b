//! Serde data structures for the header-filter configuration file.
//!
//! Contains [`Config`] (the root), [`FilterDef`] (one named filter
//! registration) and [`InitParams`], the ordered servlet-style key/value
//! pairs a filter is initialized from. Structs use `deny_unknown_fields`
//! for strict parsing.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::filter::{FilterRegistration, DEFAULT_CORRELATION_HEADER};

const fn default_timeout() -> u64 {
    5000
}

fn default_correlation_header() -> String {
    DEFAULT_CORRELATION_HEADER.to_string()
}

fn is_default_timeout(v: &u64) -> bool {
    *v == default_timeout()
}

fn is_default_correlation_header(v: &str) -> bool {
    v == DEFAULT_CORRELATION_HEADER
}

fn is_default_dump_target(v: &DumpTarget) -> bool {
    *v == DumpTarget::default()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL requests are forwarded to by `header-filter run`.
    pub upstream: String,

    /// Upstream timeout in milliseconds.
    #[serde(
        default = "default_timeout",
        skip_serializing_if = "is_default_timeout"
    )]
    pub timeout: u64,

    /// Request header carrying an upstream correlation id.
    #[serde(
        default = "default_correlation_header",
        skip_serializing_if = "is_default_correlation_header"
    )]
    pub correlation_header: String,

    #[serde(default, skip_serializing_if = "is_default_dump_target")]
    pub dump_target: DumpTarget,

    pub filters: Vec<FilterDef>,
}

impl Config {
    #[must_use]
    pub fn total_patterns(&self) -> usize {
        self.filters.iter().map(|f| f.url_patterns.len()).sum()
    }

    /// Filter registrations in declaration order.
    #[must_use]
    pub fn registrations(&self) -> Vec<FilterRegistration> {
        self.filters
            .iter()
            .map(|f| FilterRegistration {
                name: f.name.clone(),
                url_patterns: f.url_patterns.clone(),
                init_params: f.init_params.0.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpTarget {
    /// One `tracing` event per dump line.
    #[default]
    Log,
    /// Plain lines on stdout.
    Stdout,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDef {
    pub name: String,

    pub url_patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "InitParams::is_empty")]
    pub init_params: InitParams,
}

/// Init params in file order.
///
/// Deserialized from a map. Scalar values (booleans, numbers) are kept as
/// their string form, so `dump.request: true` reads as `"true"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitParams(pub Vec<(String, String)>);

impl InitParams {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the last entry named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for InitParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParamValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl From<ParamValue> for String {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Text(s) => s,
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for InitParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = InitParams;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of init param names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut params = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, ParamValue>()? {
                    params.push((key, value.into()));
                }
                Ok(InitParams(params))
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

impl Serialize for InitParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
