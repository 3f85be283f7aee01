// crates/fast-fetch-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for fast-fetch-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use fast_fetch_config::ConfigError;
use fast_fetch_config::FastFetchConfig;

/// Result type for tests that report failures as strings.
pub type TestResult = Result<(), String>;

/// Parses a TOML string into a `FastFetchConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<FastFetchConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a config with only the required source origin set.
pub fn minimal_config() -> Result<FastFetchConfig, toml::de::Error> {
    config_from_toml("[document]\nsource_origin = \"https://publisher.example\"\n")
}

/// Asserts that validation failed with a message containing `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
