// crates/fast-fetch-config/src/config.rs
// ============================================================================
// Module: Fast Fetch Configuration
// Description: Configuration loading and validation for a document context.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: fast-fetch-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use fast_fetch_core::SafeframeVersion;
use fast_fetch_core::VerifierSelection;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "fast-fetch.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "FAST_FETCH_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of key providers.
pub(crate) const MAX_KEY_PROVIDERS: usize = 32;
/// Maximum key provider name length.
const MAX_PROVIDER_NAME_LENGTH: usize = 64;
/// Minimum keyset fetch timeout in milliseconds.
pub(crate) const MIN_FETCH_TIMEOUT_MS: u64 = 100;
/// Maximum keyset fetch timeout in milliseconds.
pub(crate) const MAX_FETCH_TIMEOUT_MS: u64 = 30_000;
/// Maximum keyset document size in bytes.
pub(crate) const MAX_KEYSET_BYTES: usize = 1024 * 1024;
/// Maximum creative response size in bytes.
pub(crate) const MAX_CREATIVE_BYTES: usize = 8 * 1024 * 1024;
/// Default production error sampling threshold.
pub const DEFAULT_SAMPLE_THRESHOLD: f64 = 0.01;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for one document context.
///
/// # Invariants
/// - `validate` must succeed before the config is used.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FastFetchConfig {
    /// Host document settings.
    #[serde(default)]
    pub document: DocumentConfig,
    /// Signature verifier settings.
    #[serde(default)]
    pub verifier: VerifierConfig,
    /// Trusted key providers in registration order.
    #[serde(default)]
    pub key_providers: Vec<KeyProviderConfig>,
    /// Keyset fetch limits.
    #[serde(default)]
    pub keyset_fetch: KeysetFetchConfig,
    /// Creative fetch limits.
    #[serde(default)]
    pub creative_fetch: CreativeFetchConfig,
    /// Render defaults.
    #[serde(default)]
    pub render: RenderConfig,
    /// Error reporting settings.
    #[serde(default)]
    pub errors: ErrorConfig,
    /// Event and diagnostic sink selection.
    #[serde(default)]
    pub sinks: SinkConfig,
}

impl FastFetchConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.document.validate()?;
        self.keyset_fetch.validate()?;
        self.creative_fetch.validate()?;
        self.errors.validate()?;
        self.sinks.validate()?;
        if self.key_providers.len() > MAX_KEY_PROVIDERS {
            return Err(ConfigError::Invalid("too many key providers".to_string()));
        }
        let mut names = BTreeSet::new();
        for provider in &self.key_providers {
            provider.validate(self.keyset_fetch.allow_http)?;
            if !names.insert(provider.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate key provider name: {}",
                    provider.name
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Document
// ============================================================================

/// Host document settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentConfig {
    /// Origin asserted on ad requests, e.g. `https://publisher.example`.
    #[serde(default)]
    pub source_origin: String,
    /// Development mode routes every reported error as an error.
    #[serde(default)]
    pub development: bool,
}

impl DocumentConfig {
    /// Validates the source origin.
    fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.source_origin.trim();
        if origin.is_empty() {
            return Err(ConfigError::Invalid("document.source_origin is required".to_string()));
        }
        let url = Url::parse(origin).map_err(|_| {
            ConfigError::Invalid("document.source_origin must be an absolute origin".to_string())
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::Invalid(
                "document.source_origin must use http or https with a host".to_string(),
            ));
        }
        if !url.username().is_empty()
            || url.password().is_some()
            || url.path() != "/"
            || url.query().is_some()
            || url.fragment().is_some()
            || origin.ends_with('/')
        {
            return Err(ConfigError::Invalid(
                "document.source_origin must be a bare origin".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Signature verifier settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    /// Signature header the verifier reads.
    #[serde(default)]
    pub selection: VerifierSelection,
}

/// Trusted key provider entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyProviderConfig {
    /// Unique provider name.
    pub name: String,
    /// Keyset document URL.
    pub keyset_url: String,
}

impl KeyProviderConfig {
    /// Validates name and URL policy.
    fn validate(&self, allow_http: bool) -> Result<(), ConfigError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("key provider name is empty".to_string()));
        }
        if name != self.name || self.name.len() > MAX_PROVIDER_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!("invalid key provider name: {}", self.name)));
        }
        self.parsed_url(allow_http).map(|_| ())
    }

    /// Parses the keyset URL under the scheme policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL is invalid or its scheme is not
    /// permitted.
    pub fn parsed_url(&self, allow_http: bool) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.keyset_url).map_err(|_| {
            ConfigError::Invalid(format!("key provider {} has an invalid keyset_url", self.name))
        })?;
        match url.scheme() {
            "https" => {}
            "http" if allow_http => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "key provider {} keyset_url must use https",
                    self.name
                )));
            }
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(ConfigError::Invalid(format!(
                "key provider {} keyset_url must not embed credentials",
                self.name
            )));
        }
        Ok(url)
    }
}

// ============================================================================
// SECTION: Fetch Limits
// ============================================================================

/// Keyset fetch limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeysetFetchConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_keyset_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum keyset document size in bytes.
    #[serde(default = "default_keyset_max_bytes")]
    pub max_response_bytes: usize,
    /// Allow cleartext HTTP keyset URLs.
    #[serde(default)]
    pub allow_http: bool,
    /// User agent for keyset requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for KeysetFetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_keyset_timeout_ms(),
            max_response_bytes: default_keyset_max_bytes(),
            allow_http: false,
            user_agent: default_user_agent(),
        }
    }
}

impl KeysetFetchConfig {
    /// Validates limits.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("keyset_fetch.timeout_ms", self.timeout_ms)?;
        validate_size("keyset_fetch.max_response_bytes", self.max_response_bytes, MAX_KEYSET_BYTES)?;
        validate_user_agent("keyset_fetch.user_agent", &self.user_agent)
    }
}

/// Creative fetch limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreativeFetchConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_creative_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum creative size in bytes.
    #[serde(default = "default_creative_max_bytes")]
    pub max_response_bytes: usize,
    /// User agent for ad requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CreativeFetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_creative_timeout_ms(),
            max_response_bytes: default_creative_max_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl CreativeFetchConfig {
    /// Validates limits.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("creative_fetch.timeout_ms", self.timeout_ms)?;
        validate_size(
            "creative_fetch.max_response_bytes",
            self.max_response_bytes,
            MAX_CREATIVE_BYTES,
        )?;
        validate_user_agent("creative_fetch.user_agent", &self.user_agent)
    }
}

// ============================================================================
// SECTION: Render and Errors
// ============================================================================

/// Render defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Safeframe version used when the response does not override it.
    #[serde(default)]
    pub default_safeframe_version: SafeframeVersion,
    /// Delay ad requests until the slot is within render-ahead distance.
    #[serde(default)]
    pub delay_ad_request: bool,
}

/// Error reporting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorConfig {
    /// Probability of sending an expected-error report in production.
    #[serde(default = "default_sample_threshold")]
    pub sample_threshold: f64,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            sample_threshold: DEFAULT_SAMPLE_THRESHOLD,
        }
    }
}

impl ErrorConfig {
    /// Validates the sampling threshold.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_threshold.is_finite() || !(0.0..=1.0).contains(&self.sample_threshold) {
            return Err(ConfigError::Invalid(
                "errors.sample_threshold must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Lifecycle event sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleSinkKind {
    /// Discard events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `lifecycle_path`.
    File,
}

/// Diagnostic sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSinkKind {
    /// Discard diagnostics.
    None,
    /// JSON lines on stderr.
    #[default]
    Stderr,
}

/// Event and diagnostic sink selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
    /// Lifecycle event sink.
    #[serde(default)]
    pub lifecycle: LifecycleSinkKind,
    /// Output file for the `file` lifecycle sink.
    #[serde(default)]
    pub lifecycle_path: Option<PathBuf>,
    /// Diagnostic sink.
    #[serde(default)]
    pub diagnostics: DiagnosticSinkKind,
}

impl SinkConfig {
    /// Validates sink settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.lifecycle, &self.lifecycle_path) {
            (LifecycleSinkKind::File, None) => Err(ConfigError::Invalid(
                "sinks.lifecycle_path is required for the file sink".to_string(),
            )),
            (LifecycleSinkKind::File, Some(path)) => validate_path(path),
            (_, Some(_)) => Err(ConfigError::Invalid(
                "sinks.lifecycle_path is only valid with the file sink".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a timeout range.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if !(MIN_FETCH_TIMEOUT_MS..=MAX_FETCH_TIMEOUT_MS).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {MIN_FETCH_TIMEOUT_MS} and {MAX_FETCH_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

/// Validates a non-zero size bounded by `max`.
fn validate_size(field: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {max}")));
    }
    Ok(())
}

/// Validates a user agent string.
fn validate_user_agent(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() || value.len() > 256 || value.chars().any(char::is_control) {
        return Err(ConfigError::Invalid(format!("{field} is invalid")));
    }
    Ok(())
}

/// Default keyset timeout.
const fn default_keyset_timeout_ms() -> u64 {
    5_000
}

/// Default keyset size limit.
const fn default_keyset_max_bytes() -> usize {
    64 * 1024
}

/// Default creative timeout.
const fn default_creative_timeout_ms() -> u64 {
    10_000
}

/// Default creative size limit.
const fn default_creative_max_bytes() -> usize {
    1024 * 1024
}

/// Default user agent.
fn default_user_agent() -> String {
    "fast-fetch/0.1".to_string()
}

/// Default sampling threshold.
const fn default_sample_threshold() -> f64 {
    DEFAULT_SAMPLE_THRESHOLD
}
