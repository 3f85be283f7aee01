// crates/fast-fetch-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Fast Fetch configuration. The example must always
//! load and validate.

/// Returns a canonical example `fast-fetch.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[document]
source_origin = "https://publisher.example"
development = false

[verifier]
selection = "current"

[[key_providers]]
name = "cloudflare"
keyset_url = "https://amp.cloudflare.com/amp-ad-verifying-keyset.json"

[[key_providers]]
name = "cloudflare-dev"
keyset_url = "https://amp.cloudflare.com/amp-ad-verifying-keyset-dev.json"

[keyset_fetch]
timeout_ms = 5000
max_response_bytes = 65536
allow_http = false

[creative_fetch]
timeout_ms = 10000
max_response_bytes = 1048576

[render]
default_safeframe_version = "1-0-9"
delay_ad_request = false

[errors]
sample_threshold = 0.01

[sinks]
lifecycle = "stderr"
diagnostics = "stderr"
"#,
    )
}
