//! Application configuration for hazfill.
//!
//! User config lives at `~/.hazfill/hazfill.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HazfillError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "hazfill.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".hazfill";

// ---------------------------------------------------------------------------
// Config structs (matching hazfill.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fill thresholds and context limits.
    #[serde(default)]
    pub fill: FillConfig,

    /// Web search backend.
    #[serde(default)]
    pub search: SearchConfig,

    /// Extraction model backend.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Trusted domain lists per tier.
    #[serde(default)]
    pub tiers: TiersConfig,
}

/// `[fill]` section: knobs consumed by the fill state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillConfig {
    /// Minimum confidence for the first fill of a field.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Margin a new value must beat the existing confidence by.
    #[serde(default = "default_overwrite_delta")]
    pub overwrite_delta: f64,

    /// Per-snippet character cap when building extraction context.
    #[serde(default = "default_max_snippet_chars")]
    pub max_snippet_chars: usize,

    /// Results per search folded into the extraction context.
    #[serde(default = "default_max_results_per_search")]
    pub max_results_per_search: usize,

    /// Whether the unrestricted tier is consulted during phase 1.
    #[serde(default = "default_true")]
    pub enable_open_web_fallback: bool,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            overwrite_delta: default_overwrite_delta(),
            max_snippet_chars: default_max_snippet_chars(),
            max_results_per_search: default_max_results_per_search(),
            enable_open_web_fallback: true,
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.3
}
fn default_overwrite_delta() -> f64 {
    0.2
}
fn default_max_snippet_chars() -> usize {
    1500
}
fn default_max_results_per_search() -> usize {
    5
}
fn default_true() -> bool {
    true
}

/// `[search]` section (Tavily-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// API root.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Results requested per query.
    #[serde(default = "default_max_results_per_search")]
    pub max_results: usize,

    /// "basic" or "advanced".
    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    /// Per-request timeout.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            base_url: default_search_base_url(),
            max_results: default_max_results_per_search(),
            search_depth: default_search_depth(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_key_env() -> String {
    "TAVILY_API_KEY".into()
}
fn default_search_base_url() -> String {
    "https://api.tavily.com".into()
}
fn default_search_depth() -> String {
    "basic".into()
}
fn default_search_timeout() -> u64 {
    30
}

/// `[llm]` section (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    /// API root, up to and including the version segment.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// Per-request timeout.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_llm_key_env(),
            base_url: default_llm_base_url(),
            model: default_model(),
            temperature: 0.0,
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_llm_timeout() -> u64 {
    120
}

/// `[tiers]` section: trusted domains, in priority order within each tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiersConfig {
    /// Gas supplier SDS / technical data.
    #[serde(default = "default_suppliers")]
    pub suppliers: Vec<String>,

    /// Safety standards organizations.
    #[serde(default = "default_standards")]
    pub standards: Vec<String>,

    /// Regulatory and code bodies.
    #[serde(default = "default_regulatory")]
    pub regulatory: Vec<String>,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            suppliers: default_suppliers(),
            standards: default_standards(),
            regulatory: default_regulatory(),
        }
    }
}

fn domains(list: &[&str]) -> Vec<String> {
    list.iter().map(|d| (*d).to_string()).collect()
}

fn default_suppliers() -> Vec<String> {
    domains(&[
        "airliquide.com",
        "airproducts.com",
        "sigmaaldrich.com",
        "merckmillipore.com",
        "mathesongas.com",
        "linde.com",
        "lindeus.com",
        "praxair.com",
    ])
}
fn default_standards() -> Vec<String> {
    domains(&["osha.gov", "cdc.gov", "nfpa.org", "unece.org", "cganet.com"])
}
fn default_regulatory() -> Vec<String> {
    domains(&["iccsafe.org", "nfpa.org", "epa.gov", "echa.europa.eu"])
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.hazfill/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HazfillError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.hazfill/hazfill.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HazfillError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| HazfillError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HazfillError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HazfillError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HazfillError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject thresholds outside the unit interval.
fn validate(config: &AppConfig) -> Result<()> {
    let fill = &config.fill;
    for (name, value) in [
        ("confidence_threshold", fill.confidence_threshold),
        ("overwrite_delta", fill.overwrite_delta),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(HazfillError::config(format!(
                "fill.{name} must be within [0, 1], got {value}"
            )));
        }
    }
    if fill.max_results_per_search == 0 {
        return Err(HazfillError::config(
            "fill.max_results_per_search must be at least 1",
        ));
    }
    Ok(())
}

/// Read an API key from the env var named by the config.
pub fn resolve_api_key(var_name: &str, label: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(HazfillError::config(format!(
            "{label} API key not found. Set the {var_name} environment variable."
        ))),
    }
}
