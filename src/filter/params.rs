//! Init-param parsing for a single filter registration.
//!
//! [`FilterConfig::from_init_params`] turns the servlet-style key/value
//! pairs of one registration into the header set it injects and the two
//! dump switches. Unrecognized keys are ignored. Header names and values
//! are parsed here, once, so a bad rule is reported at startup and never
//! again per request.

use http::{HeaderName, HeaderValue};

/// Keys with this prefix name a response header to inject.
pub const SET_HEADER_PREFIX: &str = "set.header.";
pub const DUMP_REQUEST_KEY: &str = "dump.request";
pub const DUMP_RESPONSE_KEY: &str = "dump.response";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    name: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    dump_request: bool,
    dump_response: bool,
}

impl FilterConfig {
    /// Build the configuration of filter `name` from its init params.
    ///
    /// A repeated `set.header.*` key (compared case-insensitively) keeps
    /// its first position and takes the last valid value. Rules whose name
    /// or value is not valid HTTP are logged and dropped. Dumping is only
    /// enabled by the exact value `"true"`.
    pub fn from_init_params<I, K, V>(name: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self {
            name: name.to_string(),
            ..Self::default()
        };

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            tracing::debug!(filter = %name, param = %key, value = %value, "filter init param");

            if let Some(header) = key.strip_prefix(SET_HEADER_PREFIX) {
                if !header.is_empty() {
                    config.set_header(header, value);
                }
            }
            if key == DUMP_REQUEST_KEY && value == "true" {
                config.dump_request = true;
            }
            if key == DUMP_RESPONSE_KEY && value == "true" {
                config.dump_response = true;
            }
        }

        config
    }

    fn set_header(&mut self, header: &str, value: &str) {
        let (Ok(name), Ok(value)) = (header.parse::<HeaderName>(), HeaderValue::from_str(value))
        else {
            tracing::warn!(
                filter = %self.name,
                header = %header,
                "invalid header name or value in set.header, skipping"
            );
            return;
        };

        match self.headers.iter_mut().find(|(h, _)| *h == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header name/value pairs to add when absent from a response.
    #[must_use]
    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    #[must_use]
    pub const fn dump_request(&self) -> bool {
        self.dump_request
    }

    #[must_use]
    pub const fn dump_response(&self) -> bool {
        self.dump_response
    }
}
