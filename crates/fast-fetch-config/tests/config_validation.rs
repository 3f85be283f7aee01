//! Config validation tests for fast-fetch-config.
// crates/fast-fetch-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Field and cross-field validation for fast-fetch.toml.
// Purpose: Ensure invalid configuration fails closed with stable messages.
// =============================================================================

mod common;

use std::path::PathBuf;

use common::TestResult;
use common::assert_invalid;
use common::config_from_toml;
use common::minimal_config;
use fast_fetch_config::DEFAULT_SAMPLE_THRESHOLD;
use fast_fetch_config::DiagnosticSinkKind;
use fast_fetch_config::KeyProviderConfig;
use fast_fetch_config::LifecycleSinkKind;
use fast_fetch_core::VerifierSelection;

fn provider(name: &str, url: &str) -> KeyProviderConfig {
    KeyProviderConfig {
        name: name.to_string(),
        keyset_url: url.to_string(),
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn minimal_config_uses_defaults() -> TestResult {
    let config = minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.verifier.selection != VerifierSelection::Current {
        return Err("expected current verifier by default".to_string());
    }
    if config.keyset_fetch.timeout_ms != 5_000 || config.keyset_fetch.max_response_bytes != 65_536
    {
        return Err("unexpected keyset fetch defaults".to_string());
    }
    if config.creative_fetch.timeout_ms != 10_000 {
        return Err("unexpected creative fetch default".to_string());
    }
    if (config.errors.sample_threshold - DEFAULT_SAMPLE_THRESHOLD).abs() > f64::EPSILON {
        return Err("unexpected sample threshold default".to_string());
    }
    if config.render.default_safeframe_version.as_str() != "1-0-9" {
        return Err("unexpected safeframe default".to_string());
    }
    if config.sinks.lifecycle != LifecycleSinkKind::None
        || config.sinks.diagnostics != DiagnosticSinkKind::Stderr
    {
        return Err("unexpected sink defaults".to_string());
    }
    Ok(())
}

#[test]
fn legacy_selection_parses() -> TestResult {
    let config = config_from_toml(
        "[document]\nsource_origin = \"https://publisher.example\"\n[verifier]\nselection = \
         \"legacy\"\n",
    )
    .map_err(|err| err.to_string())?;
    if config.verifier.selection != VerifierSelection::Legacy {
        return Err("expected legacy selection".to_string());
    }
    Ok(())
}

#[test]
fn invalid_safeframe_version_fails_parse() {
    let result = config_from_toml(
        "[document]\nsource_origin = \"https://publisher.example\"\n[render]\n\
         default_safeframe_version = \"one\"\n",
    );
    assert!(result.is_err());
}

// ============================================================================
// SECTION: Document
// ============================================================================

#[test]
fn source_origin_is_required() -> TestResult {
    let config = config_from_toml("").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "document.source_origin is required")
}

#[test]
fn source_origin_rejects_paths_and_trailing_slash() -> TestResult {
    for origin in ["https://publisher.example/", "https://publisher.example/page", "https://a.example?x=1"]
    {
        let mut config = minimal_config().map_err(|err| err.to_string())?;
        config.document.source_origin = origin.to_string();
        assert_invalid(config.validate(), "bare origin")?;
    }
    Ok(())
}

#[test]
fn source_origin_rejects_other_schemes() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.document.source_origin = "ftp://publisher.example".to_string();
    assert_invalid(config.validate(), "http or https")
}

#[test]
fn source_origin_rejects_relative_values() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.document.source_origin = "publisher.example".to_string();
    assert_invalid(config.validate(), "absolute origin")
}

#[test]
fn source_origin_accepts_port() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.document.source_origin = "http://localhost:8000".to_string();
    config.validate().map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Key Providers
// ============================================================================

#[test]
fn duplicate_provider_names_rejected() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.key_providers = vec![
        provider("cloudflare", "https://a.example/keys.json"),
        provider("cloudflare", "https://b.example/keys.json"),
    ];
    assert_invalid(config.validate(), "duplicate key provider name: cloudflare")
}

#[test]
fn provider_name_must_be_trimmed() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.key_providers = vec![provider(" padded", "https://a.example/keys.json")];
    assert_invalid(config.validate(), "invalid key provider name")?;
    config.key_providers = vec![provider("  ", "https://a.example/keys.json")];
    assert_invalid(config.validate(), "key provider name is empty")
}

#[test]
fn provider_url_requires_https_unless_allowed() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.key_providers = vec![provider("local", "http://127.0.0.1:8080/keys.json")];
    assert_invalid(config.validate(), "must use https")?;
    config.keyset_fetch.allow_http = true;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn provider_url_rejects_credentials() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.key_providers = vec![provider("cf", "https://user:pw@a.example/keys.json")];
    assert_invalid(config.validate(), "must not embed credentials")
}

#[test]
fn provider_url_must_parse() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.key_providers = vec![provider("cf", "not a url")];
    assert_invalid(config.validate(), "invalid keyset_url")
}

#[test]
fn too_many_providers_rejected() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.key_providers = (0 .. 33)
        .map(|index| provider(&format!("p{index}"), "https://a.example/keys.json"))
        .collect();
    assert_invalid(config.validate(), "too many key providers")
}

// ============================================================================
// SECTION: Limits
// ============================================================================

#[test]
fn fetch_timeouts_are_bounded() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.keyset_fetch.timeout_ms = 10;
    assert_invalid(config.validate(), "keyset_fetch.timeout_ms")?;
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.creative_fetch.timeout_ms = 60_000;
    assert_invalid(config.validate(), "creative_fetch.timeout_ms")
}

#[test]
fn fetch_sizes_are_bounded() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.keyset_fetch.max_response_bytes = 0;
    assert_invalid(config.validate(), "keyset_fetch.max_response_bytes")?;
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.creative_fetch.max_response_bytes = 9 * 1024 * 1024;
    assert_invalid(config.validate(), "creative_fetch.max_response_bytes")
}

#[test]
fn user_agent_rejects_control_characters() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.creative_fetch.user_agent = "agent\nsmuggled".to_string();
    assert_invalid(config.validate(), "creative_fetch.user_agent is invalid")
}

#[test]
fn sample_threshold_must_be_probability() -> TestResult {
    for value in [-0.1, 1.5, f64::NAN] {
        let mut config = minimal_config().map_err(|err| err.to_string())?;
        config.errors.sample_threshold = value;
        assert_invalid(config.validate(), "errors.sample_threshold")?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

#[test]
fn file_sink_requires_path() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.sinks.lifecycle = LifecycleSinkKind::File;
    assert_invalid(config.validate(), "sinks.lifecycle_path is required")?;
    config.sinks.lifecycle_path = Some(PathBuf::from("events.jsonl"));
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn sink_path_without_file_sink_rejected() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.sinks.lifecycle = LifecycleSinkKind::Stderr;
    config.sinks.lifecycle_path = Some(PathBuf::from("events.jsonl"));
    assert_invalid(config.validate(), "only valid with the file sink")
}
