// crates/fast-fetch-cli/src/main.rs
// ============================================================================
// Module: Fast Fetch CLI Entry Point
// Description: Command dispatcher for config, creative, and verification tools.
// Purpose: Inspect creatives and ad responses outside a host document.
// Dependencies: clap, fast-fetch-config, fast-fetch-core, fast-fetch-runtime,
//               fast-fetch-verifier, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! The Fast Fetch CLI validates configuration files, extracts creative
//! metadata, previews render strategy selection, verifies creative
//! signatures against configured key providers, and runs a fetch, verify,
//! and select pass against a live ad URL. Every command prints JSON.
//!
//! Security posture: creative files and ad responses are untrusted; file
//! reads are size-limited and nothing is rendered.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use fast_fetch_config::FastFetchConfig;
use fast_fetch_config::config_toml_example;
use fast_fetch_core::RenderDecision;
use fast_fetch_core::ResponseHeaders;
use fast_fetch_core::VerificationStatus;
use fast_fetch_core::extract_metadata;
use fast_fetch_core::select_render_mode;
use fast_fetch_runtime::CreativeFetcher;
use fast_fetch_runtime::DocumentContext;
use fast_fetch_runtime::FetchOutcome;
use fast_fetch_runtime::HttpCreativeTransport;
use fast_fetch_runtime::HttpCreativeTransportConfig;
use fast_fetch_runtime::StderrDiagnostics;
use fast_fetch_verifier::SignatureVerificationService;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum creative file size accepted by file-based commands.
const MAX_CREATIVE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "fast-fetch", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Extract creative metadata from a creative file.
    Metadata(MetadataCommand),
    /// Preview render strategy selection for response headers.
    Select(SelectCommand),
    /// Verify a creative signature against configured key providers.
    Verify(VerifyCommand),
    /// Fetch, verify, and select a render mode for a live ad URL.
    Inspect(InspectCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
    /// Print the canonical example configuration.
    Example,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to `FAST_FETCH_CONFIG` or `fast-fetch.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `metadata`.
#[derive(Args, Debug)]
struct MetadataCommand {
    /// Creative file to read.
    #[arg(long, value_name = "FILE")]
    creative: PathBuf,
}

/// Arguments for `select`.
#[derive(Args, Debug)]
struct SelectCommand {
    /// Verification outcome to assume.
    #[arg(long, value_enum, default_value_t = StatusArg::Unverified)]
    status: StatusArg,
    /// Response header, repeatable.
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header_arg)]
    headers: Vec<(String, String)>,
}

/// Arguments for `verify`.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Config file declaring key providers.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Creative file whose bytes were signed.
    #[arg(long, value_name = "FILE")]
    creative: PathBuf,
    /// Response header carrying the signature, repeatable.
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header_arg)]
    headers: Vec<(String, String)>,
}

/// Arguments for `inspect`.
#[derive(Args, Debug)]
struct InspectCommand {
    /// Config file declaring the source origin and key providers.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Absolute ad request URL.
    #[arg(long, value_name = "URL")]
    ad_url: String,
}

/// Verification outcomes accepted by `select`.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum StatusArg {
    /// Signature validated.
    Ok,
    /// No signature offered.
    Unverified,
    /// No usable key found.
    KeyNotFound,
    /// Keys tried, none matched.
    SignatureMismatch,
    /// Verification failed unexpectedly.
    Unknown,
}

impl From<StatusArg> for VerificationStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Ok => Self::Ok,
            StatusArg::Unverified => Self::Unverified,
            StatusArg::KeyNotFound => Self::ErrorKeyNotFound,
            StatusArg::SignatureMismatch => Self::ErrorSignatureMismatch,
            StatusArg::Unknown => Self::ErrorUnknown,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        write_stdout_line(&format!("fast-fetch {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        write_stdout_line("fast-fetch: no command given; run with --help for usage")?;
        return Ok(ExitCode::SUCCESS);
    };
    match command {
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Metadata(command) => command_metadata(&command),
        Commands::Select(command) => command_select(&command),
        Commands::Verify(command) => command_verify(&command).await,
        Commands::Inspect(command) => command_inspect(&command).await,
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => {
            let config = load_config(command.config.as_deref())?;
            write_json(&json!({
                "status": "ok",
                "source_origin": config.document.source_origin,
                "key_providers": config.key_providers.len(),
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<FastFetchConfig> {
    FastFetchConfig::load(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

// ============================================================================
// SECTION: Creative Commands
// ============================================================================

/// Executes the metadata extraction command.
fn command_metadata(command: &MetadataCommand) -> CliResult<ExitCode> {
    let creative = read_creative(&command.creative)?;
    let (report, found) = metadata_report(&String::from_utf8_lossy(&creative))?;
    write_json(&report)?;
    Ok(if found { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Builds the metadata report; the flag is false when no valid block exists.
fn metadata_report(creative: &str) -> CliResult<(Value, bool)> {
    match extract_metadata(creative) {
        Some(metadata) => {
            let metadata = serde_json::to_value(&metadata)
                .map_err(|err| CliError::new(format!("failed to serialize metadata: {err}")))?;
            Ok((json!({ "valid": true, "metadata": metadata }), true))
        }
        None => Ok((json!({ "valid": false }), false)),
    }
}

/// Executes the render selection preview.
fn command_select(command: &SelectCommand) -> CliResult<ExitCode> {
    let headers = header_map(&command.headers);
    let decision = select_render_mode(command.status.into(), &headers, &StderrDiagnostics);
    write_json(&decision_report(&decision)?)?;
    Ok(ExitCode::SUCCESS)
}

/// Serializes a render decision.
fn decision_report(decision: &RenderDecision) -> CliResult<Value> {
    serde_json::to_value(decision)
        .map_err(|err| CliError::new(format!("failed to serialize render decision: {err}")))
}

// ============================================================================
// SECTION: Verification Commands
// ============================================================================

/// Executes the signature verification command.
async fn command_verify(command: &VerifyCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let context = DocumentContext::from_config(&config)
        .map_err(|err| CliError::new(format!("failed to build context: {err}")))?;
    let creative = read_creative(&command.creative)?;
    let headers = header_map(&command.headers);
    let (status, unused) = verify(&context.verification_service(), &creative, &headers).await;
    write_json(&json!({
        "status": status.as_str(),
        "code": status.code(),
        "unused_providers": unused,
    }))?;
    Ok(if status.is_verified() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Executes a fetch, verify, and select pass for one ad URL.
async fn command_inspect(command: &InspectCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let context = DocumentContext::from_config(&config)
        .map_err(|err| CliError::new(format!("failed to build context: {err}")))?;
    let transport = HttpCreativeTransport::new(&HttpCreativeTransportConfig {
        timeout_ms: config.creative_fetch.timeout_ms,
        max_response_bytes: config.creative_fetch.max_response_bytes,
        user_agent: config.creative_fetch.user_agent.clone(),
    })
    .map_err(|err| CliError::new(format!("failed to build transport: {err}")))?;
    let fetcher = CreativeFetcher::new(Arc::new(transport));
    let outcome = fetcher
        .fetch(&command.ad_url, &config.document.source_origin)
        .await
        .map_err(|err| CliError::new(format!("ad request failed: {err}")))?;
    let response = match outcome {
        FetchOutcome::NoContent => {
            write_json(&json!({ "outcome": "no_content" }))?;
            return Ok(ExitCode::SUCCESS);
        }
        FetchOutcome::Creative(response) => response,
    };
    let (status, unused) =
        verify(&context.verification_service(), response.bytes(), response.headers()).await;
    let decision = select_render_mode(status, response.headers(), &StderrDiagnostics);
    let metadata_valid = extract_metadata(&response.text_lossy()).is_some();
    write_json(&json!({
        "outcome": "creative",
        "bytes": response.bytes().len(),
        "verification": {
            "status": status.as_str(),
            "code": status.code(),
            "unused_providers": unused,
        },
        "decision": decision_report(&decision)?,
        "metadata_valid": metadata_valid,
    }))?;
    Ok(ExitCode::SUCCESS)
}

/// Runs verification, collecting providers whose keys went unused.
async fn verify(
    service: &SignatureVerificationService,
    payload: &[u8],
    headers: &ResponseHeaders,
) -> (VerificationStatus, Vec<String>) {
    let mut unused = Vec::new();
    let status = service
        .verify(payload, headers, |provider: &str| unused.push(provider.to_string()))
        .await;
    (status, unused)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Parses a `NAME:VALUE` header argument.
fn parse_header_arg(raw: &str) -> Result<(String, String), String> {
    let (name, value) =
        raw.split_once(':').ok_or_else(|| format!("expected NAME:VALUE, got {raw}"))?;
    let name = name.trim();
    if name.is_empty() || name.bytes().any(|byte| byte.is_ascii_control() || byte == b' ') {
        return Err(format!("invalid header name in {raw}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Builds a header map, joining repeated names.
fn header_map(pairs: &[(String, String)]) -> ResponseHeaders {
    let mut headers = ResponseHeaders::new();
    for (name, value) in pairs {
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Reads a creative file under the size limit.
fn read_creative(path: &Path) -> CliResult<Vec<u8>> {
    read_bytes_with_limit(path, MAX_CREATIVE_BYTES).map_err(|err| match err {
        ReadLimitError::Io(error) => {
            CliError::new(format!("failed to read {}: {error}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{} is {size} bytes, exceeding the {limit} byte limit",
            path.display()
        )),
    })
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes pretty JSON to stdout.
fn write_json(value: &Value) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&rendered)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}
