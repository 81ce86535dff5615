use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default maximum size of a compressed body that will be decompressed (10 MiB).
pub const DEFAULT_MAX_SIZE: usize = 10 * 1024 * 1024;

/// Declarative settings for the ungzip middleware.
///
/// This is the raw, deserializable form. It is turned into a [`Policy`] by
/// [`UngzipConfig::into_policy`], which rejects negative sizes and resolves
/// an unset or zero `max_size` to [`DEFAULT_MAX_SIZE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UngzipConfig {
    /// Only process responses to requests whose path starts with one of these.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,

    /// Only process responses whose `Content-Type` starts with one of these.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_types: Vec<String>,

    /// Largest compressed body (in bytes) that will be decompressed.
    ///
    /// This bounds the buffered, still-compressed size only. The decoded body
    /// is not limited and may be much larger.
    #[serde(skip_serializing_if = "is_zero")]
    pub max_size: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl UngzipConfig {
    /// Parses the settings from a TOML document.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Checks the settings without consuming them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size < 0 {
            return Err(ConfigError::NegativeMaxSize(self.max_size));
        }
        Ok(())
    }

    /// Validates the settings and finalizes them into an immutable [`Policy`].
    pub fn into_policy(self) -> Result<Policy, ConfigError> {
        self.validate()?;

        let max_size = match usize::try_from(self.max_size) {
            Ok(0) => DEFAULT_MAX_SIZE,
            Ok(size) => size,
            // Only reachable on targets where usize is narrower than i64.
            Err(_) => usize::MAX,
        };

        Ok(Policy {
            paths: self.paths,
            content_types: self.content_types,
            max_size,
        })
    }
}

/// Validated, read-only filter policy shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    paths: Vec<String>,
    content_types: Vec<String>,
    max_size: usize,
}

impl Policy {
    /// Configured path prefixes; empty matches every path.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Configured content-type prefixes; empty matches every content type.
    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    /// Largest compressed body that will be decompressed. The decoded size is
    /// not limited.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub(crate) fn set_paths(&mut self, paths: Vec<String>) {
        self.paths = paths;
    }

    pub(crate) fn set_content_types(&mut self, content_types: Vec<String>) {
        self.content_types = content_types;
    }

    pub(crate) fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
    }

    /// Returns true if the request path passes the path gate.
    pub fn matches_path(&self, path: &str) -> bool {
        matches_prefix(&self.paths, path)
    }

    /// Returns true if the response content type passes the content-type gate.
    pub fn matches_content_type(&self, content_type: &str) -> bool {
        matches_prefix(&self.content_types, content_type)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            content_types: Vec::new(),
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

/// Literal, case-sensitive prefix match. An empty prefix list matches anything.
fn matches_prefix(prefixes: &[String], value: &str) -> bool {
    prefixes.is_empty() || prefixes.iter().any(|prefix| value.starts_with(prefix.as_str()))
}
