use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use eorbench_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let rates = if config.currency.rates.is_empty() {
        "<none>".to_string()
    } else {
        config
            .currency
            .rates
            .iter()
            .map(|(code, rate)| format!("{code}={rate}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let entries: Vec<(&str, String, &str)> = vec![
        ("llm.enabled", config.llm.enabled.to_string(), "EORBENCH_LLM_ENABLED"),
        ("llm.provider", format!("{:?}", config.llm.provider), "EORBENCH_LLM_PROVIDER"),
        ("llm.model", config.llm.model.clone(), "EORBENCH_LLM_MODEL"),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "EORBENCH_LLM_BASE_URL",
        ),
        ("llm.api_key", llm_api_key.to_string(), "EORBENCH_LLM_API_KEY"),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), "EORBENCH_LLM_TIMEOUT_SECS"),
        ("llm.max_retries", config.llm.max_retries.to_string(), "EORBENCH_LLM_MAX_RETRIES"),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            "EORBENCH_SERVER_BIND_ADDRESS",
        ),
        ("server.port", config.server.port.to_string(), "EORBENCH_SERVER_PORT"),
        ("logging.level", config.logging.level.clone(), "EORBENCH_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "EORBENCH_LOGGING_FORMAT"),
        (
            "reconciliation.threshold",
            config.reconciliation.threshold.to_string(),
            "EORBENCH_RECONCILIATION_THRESHOLD",
        ),
        (
            "reconciliation.risk_mode",
            config.reconciliation.risk_mode.to_string(),
            "EORBENCH_RECONCILIATION_RISK_MODE",
        ),
        (
            "reconciliation.risk_absolute_floor",
            config.reconciliation.risk_absolute_floor.to_string(),
            "EORBENCH_RECONCILIATION_RISK_ABSOLUTE_FLOOR",
        ),
        (
            "reconciliation.contract_months",
            config.reconciliation.contract_months.to_string(),
            "EORBENCH_RECONCILIATION_CONTRACT_MONTHS",
        ),
        ("currency.base", config.currency.base.clone(), "EORBENCH_CURRENCY_BASE"),
        ("currency.rates", rates, "EORBENCH_CURRENCY_RATES"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in entries {
        lines.push(render_line(
            key,
            &value,
            field_source(
                key,
                Some(env_key),
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("eorbench.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/eorbench.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, field_source};

    #[test]
    fn source_prefers_file_over_default() {
        let doc: toml::Value = "[reconciliation]\nthreshold = \"0.05\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "reconciliation.threshold"));
        assert!(!contains_path(&doc, "reconciliation.risk_mode"));
        assert_eq!(
            field_source(
                "reconciliation.threshold",
                Some("EORBENCH_TEST_UNSET_KEY"),
                Some(&doc),
                Some(std::path::Path::new("eorbench.toml")),
            ),
            "file (eorbench.toml)"
        );
        assert_eq!(
            field_source("currency.base", Some("EORBENCH_TEST_UNSET_KEY"), Some(&doc), None),
            "default"
        );
    }
}
