use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub reconciliation: ReconciliationConfig,
    pub currency: CurrencyConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// Fractional mismatch tolerance, `0.04` = 4%.
    pub threshold: Decimal,
    pub risk_mode: bool,
    /// Absolute difference flagged in risk mode regardless of the ratio.
    pub risk_absolute_floor: Decimal,
    pub contract_months: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrencyConfig {
    pub base: String,
    /// Units of each currency per one unit of `base`.
    pub rates: BTreeMap<String, Decimal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_enabled: Option<bool>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub server_port: Option<u16>,
    pub threshold: Option<Decimal>,
    pub risk_mode: Option<bool>,
    pub contract_months: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_THRESHOLD: Decimal = Decimal::from_parts(4, 0, 0, false, 2);
pub const DEFAULT_RISK_ABSOLUTE_FLOOR: Decimal = Decimal::ONE;
pub const DEFAULT_CONTRACT_MONTHS: u32 = 12;

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            risk_mode: false,
            risk_absolute_floor: DEFAULT_RISK_ABSOLUTE_FLOOR,
            contract_months: DEFAULT_CONTRACT_MONTHS,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                enabled: false,
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            reconciliation: ReconciliationConfig::default(),
            currency: CurrencyConfig { base: "USD".to_string(), rates: BTreeMap::new() },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("eorbench.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(enabled) = llm.enabled {
                self.llm.enabled = enabled;
            }
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(reconciliation) = patch.reconciliation {
            if let Some(threshold) = reconciliation.threshold {
                self.reconciliation.threshold = threshold;
            }
            if let Some(risk_mode) = reconciliation.risk_mode {
                self.reconciliation.risk_mode = risk_mode;
            }
            if let Some(floor) = reconciliation.risk_absolute_floor {
                self.reconciliation.risk_absolute_floor = floor;
            }
            if let Some(contract_months) = reconciliation.contract_months {
                self.reconciliation.contract_months = contract_months;
            }
        }

        if let Some(currency) = patch.currency {
            if let Some(base) = currency.base {
                self.currency.base = base;
            }
            if let Some(rates) = currency.rates {
                self.currency.rates = normalize_rates(rates);
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("EORBENCH_LLM_ENABLED") {
            self.llm.enabled = parse_bool("EORBENCH_LLM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("EORBENCH_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("EORBENCH_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("EORBENCH_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("EORBENCH_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("EORBENCH_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("EORBENCH_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("EORBENCH_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("EORBENCH_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("EORBENCH_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("EORBENCH_SERVER_PORT") {
            self.server.port = parse_u16("EORBENCH_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("EORBENCH_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("EORBENCH_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("EORBENCH_LOGGING_LEVEL").or_else(|| read_env("EORBENCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("EORBENCH_LOGGING_FORMAT").or_else(|| read_env("EORBENCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("EORBENCH_RECONCILIATION_THRESHOLD") {
            self.reconciliation.threshold =
                parse_decimal("EORBENCH_RECONCILIATION_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("EORBENCH_RECONCILIATION_RISK_MODE") {
            self.reconciliation.risk_mode =
                parse_bool("EORBENCH_RECONCILIATION_RISK_MODE", &value)?;
        }
        if let Some(value) = read_env("EORBENCH_RECONCILIATION_RISK_ABSOLUTE_FLOOR") {
            self.reconciliation.risk_absolute_floor =
                parse_decimal("EORBENCH_RECONCILIATION_RISK_ABSOLUTE_FLOOR", &value)?;
        }
        if let Some(value) = read_env("EORBENCH_RECONCILIATION_CONTRACT_MONTHS") {
            self.reconciliation.contract_months =
                parse_u32("EORBENCH_RECONCILIATION_CONTRACT_MONTHS", &value)?;
        }

        if let Some(value) = read_env("EORBENCH_CURRENCY_BASE") {
            self.currency.base = value;
        }
        if let Some(value) = read_env("EORBENCH_CURRENCY_RATES") {
            self.currency.rates = parse_rates("EORBENCH_CURRENCY_RATES", &value)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(threshold) = overrides.threshold {
            self.reconciliation.threshold = threshold;
        }
        if let Some(risk_mode) = overrides.risk_mode {
            self.reconciliation.risk_mode = risk_mode;
        }
        if let Some(contract_months) = overrides.contract_months {
            self.reconciliation.contract_months = contract_months;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        validate_reconciliation(&self.reconciliation)?;
        validate_currency(&self.currency)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("eorbench.toml"), PathBuf::from("config/eorbench.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !llm.enabled {
        return Ok(());
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model is required when llm.enabled".to_string()));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_reconciliation(reconciliation: &ReconciliationConfig) -> Result<(), ConfigError> {
    if reconciliation.threshold < Decimal::ZERO || reconciliation.threshold > Decimal::ONE {
        return Err(ConfigError::Validation(
            "reconciliation.threshold must be in range 0..=1".to_string(),
        ));
    }

    if reconciliation.risk_absolute_floor < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "reconciliation.risk_absolute_floor must not be negative".to_string(),
        ));
    }

    if reconciliation.contract_months == 0 || reconciliation.contract_months > 120 {
        return Err(ConfigError::Validation(
            "reconciliation.contract_months must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_currency(currency: &CurrencyConfig) -> Result<(), ConfigError> {
    if !is_currency_code(&currency.base) {
        return Err(ConfigError::Validation(
            "currency.base must be a three-letter ISO 4217 code".to_string(),
        ));
    }

    for (code, rate) in &currency.rates {
        if !is_currency_code(code) {
            return Err(ConfigError::Validation(format!(
                "currency.rates key `{code}` is not a three-letter ISO 4217 code"
            )));
        }
        if *rate <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "currency.rates.{code} must be greater than zero"
            )));
        }
    }

    Ok(())
}

pub fn is_currency_code(value: &str) -> bool {
    let value = value.trim();
    value.len() == 3 && value.chars().all(|ch| ch.is_ascii_alphabetic())
}

fn normalize_rates(rates: BTreeMap<String, Decimal>) -> BTreeMap<String, Decimal> {
    rates.into_iter().map(|(code, rate)| (code.trim().to_ascii_uppercase(), rate)).collect()
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| invalid_override(key, value))
}

/// `EUR=0.92,GBP=0.79`
fn parse_rates(key: &str, value: &str) -> Result<BTreeMap<String, Decimal>, ConfigError> {
    value
        .split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let (code, rate) = pair.split_once('=').ok_or_else(|| invalid_override(key, value))?;
            Ok((code.trim().to_ascii_uppercase(), parse_decimal(key, rate)?))
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    reconciliation: Option<ReconciliationPatch>,
    currency: Option<CurrencyPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ReconciliationPatch {
    threshold: Option<Decimal>,
    risk_mode: Option<bool>,
    risk_absolute_floor: Option<Decimal>,
    contract_months: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrencyPatch {
    base: Option<String>,
    rates: Option<BTreeMap<String, Decimal>>,
}
