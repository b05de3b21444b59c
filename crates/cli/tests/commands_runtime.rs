use std::env;
use std::io::Write;
use std::sync::{Mutex, OnceLock};

use eorbench_cli::commands::{compare, config, extract, reconcile};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

#[test]
fn extract_returns_the_first_positive_total() {
    with_env(&[], || {
        let input = json_file(&json!({"data": {"total_costs": 2900, "salary": 2500}}));

        let result = extract::run("deel", input.path(), None, None);
        assert_eq!(result.exit_code, 0, "expected successful extraction");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "extract");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["provider"], "deel");
        assert_eq!(payload["data"]["monthlyTotal"], "2900");
    });
}

#[test]
fn extract_prefers_the_enhancement_breakdown() {
    with_env(&[], || {
        let input = json_file(&json!({"total_costs": 2900}));
        let enhancement = json_file(&json!({
            "provider": "deel",
            "baseQuote": {"monthlyTotal": "2900"},
            "monthlyCostBreakdown": {"baseCost": "2900", "enhancements": "120"}
        }));

        let result = extract::run("deel", input.path(), Some(enhancement.path()), Some(12));
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["monthlyTotal"], "3020");
    });
}

#[test]
fn extract_rejects_unknown_providers() {
    with_env(&[], || {
        let input = json_file(&json!({"total": 100}));

        let result = extract::run("acme", input.path(), None, None);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "unknown_provider");
    });
}

#[test]
fn extract_reports_unextractable_payloads() {
    with_env(&[], || {
        let input = json_file(&json!({"status": "pending"}));

        let result = extract::run("remote", input.path(), None, None);
        assert_eq!(result.exit_code, 1);
        assert_eq!(parse_payload(&result.output)["error_class"], "unextractable_price");
    });
}

#[test]
fn compare_ranks_a_bare_quote_array() {
    with_env(&[], || {
        let input = json_file(&json!([
            {"provider": "remote", "raw": {"monthly_total": 3100}},
            {"provider": "deel", "raw": {"total_costs": 2900}},
            {"provider": "papaya", "raw": {}}
        ]));

        let result = compare::run(input.path(), None);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["ranked"][0]["provider"], "deel");
        assert_eq!(payload["data"]["ranked"][1]["provider"], "remote");
        assert_eq!(payload["data"]["excluded"][0]["provider"], "papaya");
        assert!(payload["message"].as_str().unwrap_or_default().contains("cheapest is deel"));
    });
}

#[test]
fn compare_reports_missing_input_files() {
    with_env(&[], || {
        let result = compare::run(std::path::Path::new("/nonexistent/quotes.json"), None);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "input_unreadable");
    });
}

#[test]
fn reconcile_runs_locally_and_finds_no_discrepancy() {
    with_env(&[], || {
        let input = json_file(&reconciliation_request(""));

        let result = reconcile::run(input.path(), false);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["discrepancies"], json!([]));
        assert_eq!(payload["data"]["metadata"]["engine"], "local-only");
    });
}

#[test]
fn reconcile_with_llm_falls_back_when_no_llm_is_enabled() {
    with_env(&[("EORBENCH_LLM_ENABLED", "false")], || {
        let input = json_file(&reconciliation_request(""));

        let result = reconcile::run(input.path(), true);
        assert_eq!(result.exit_code, 0);
        assert_eq!(parse_payload(&result.output)["data"]["metadata"]["engine"], "local-only");
    });
}

#[test]
fn reconcile_flags_declared_totals_above_threshold() {
    with_env(&[("EORBENCH_RECONCILIATION_THRESHOLD", "0.02")], || {
        let input = json_file(&reconciliation_request("2300"));

        let result = reconcile::run(input.path(), false);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["discrepancies"][0]["provider"], "deel");
        assert_eq!(payload["data"]["metadata"]["threshold"], "0.02");
    });
}

#[test]
fn reconcile_rejects_requests_without_target_currency() {
    with_env(&[], || {
        let input = json_file(&json!({"enhancements": [], "targetCurrency": " "}));

        let result = reconcile::run(input.path(), false);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "malformed_input");
    });
}

#[test]
fn reconcile_exits_with_conversion_failure_when_a_rate_is_missing() {
    with_env(&[], || {
        let mut request = reconciliation_request("");
        request["enhancements"][0]["currency"] = json!("JPY");
        let input = json_file(&request);

        let result = reconcile::run(input.path(), false);
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "conversion_failure");
        assert!(payload["message"].as_str().unwrap_or_default().contains("JPY->USD"));
    });
}

#[test]
fn reconcile_with_an_unreachable_llm_falls_back_to_local() {
    let env = [
        ("EORBENCH_LLM_ENABLED", "true"),
        ("EORBENCH_LLM_PROVIDER", "ollama"),
        ("EORBENCH_LLM_BASE_URL", "http://127.0.0.1:9"),
        ("EORBENCH_LLM_MAX_RETRIES", "0"),
        ("EORBENCH_LLM_TIMEOUT_SECS", "2"),
    ];
    with_env(&env, || {
        let input = json_file(&reconciliation_request("2300"));

        let result = reconcile::run(input.path(), true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["metadata"]["engine"], "local-only");
        assert_eq!(payload["data"]["discrepancies"][0]["provider"], "deel");
        assert_eq!(payload["data"]["recommendations"], json!([]));
    });
}

#[test]
fn oversized_amounts_are_malformed_input() {
    with_env(&[], || {
        let huge = "70000000000000000000000000000";
        let reconcile_input = json_file(&json!({
            "enhancements": [{
                "provider": "deel",
                "baseQuote": {"monthlyTotal": huge},
                "totalEnhancement": huge
            }],
            "targetCurrency": "USD"
        }));
        let result = reconcile::run(reconcile_input.path(), false);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "malformed_input");

        let compare_input =
            json_file(&json!([{"provider": "remote", "raw": {"monthly_total": huge}}]));
        let result = compare::run(compare_input.path(), None);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "malformed_input");
    });
}

#[test]
fn config_reports_sources_for_reconciliation_settings() {
    with_env(&[("EORBENCH_RECONCILIATION_RISK_MODE", "true")], || {
        let output = config::run();

        assert!(output.starts_with("effective config"));
        assert!(output.contains("- reconciliation.threshold = 0.04 (source: default)"));
        assert!(output.contains(
            "- reconciliation.risk_mode = true (source: env (EORBENCH_RECONCILIATION_RISK_MODE))"
        ));
        assert!(output.contains("- llm.api_key = <unset>"));
    });
}

#[test]
fn invalid_config_is_a_config_validation_failure() {
    with_env(&[("EORBENCH_RECONCILIATION_THRESHOLD", "2")], || {
        let input = json_file(&reconciliation_request(""));

        let result = reconcile::run(input.path(), false);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

fn reconciliation_request(final_total: &str) -> Value {
    let mut quote = json!({
        "provider": "deel",
        "baseQuote": {"monthlyTotal": "2000"},
        "monthlyCostBreakdown": {"baseCost": "2000", "enhancements": "150"}
    });
    if !final_total.is_empty() {
        quote["finalTotal"] = json!(final_total);
    }
    json!({"enhancements": [quote], "targetCurrency": "USD"})
}

fn json_file(value: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file should be created");
    file.write_all(value.to_string().as_bytes()).expect("temp file should be writable");
    file
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "EORBENCH_LLM_ENABLED",
        "EORBENCH_LLM_PROVIDER",
        "EORBENCH_LLM_API_KEY",
        "EORBENCH_LLM_BASE_URL",
        "EORBENCH_LLM_MODEL",
        "EORBENCH_LLM_TIMEOUT_SECS",
        "EORBENCH_LLM_MAX_RETRIES",
        "EORBENCH_SERVER_BIND_ADDRESS",
        "EORBENCH_SERVER_PORT",
        "EORBENCH_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "EORBENCH_LOGGING_LEVEL",
        "EORBENCH_LOGGING_FORMAT",
        "EORBENCH_LOG_LEVEL",
        "EORBENCH_LOG_FORMAT",
        "EORBENCH_RECONCILIATION_THRESHOLD",
        "EORBENCH_RECONCILIATION_RISK_MODE",
        "EORBENCH_RECONCILIATION_RISK_ABSOLUTE_FLOOR",
        "EORBENCH_RECONCILIATION_CONTRACT_MONTHS",
        "EORBENCH_CURRENCY_BASE",
        "EORBENCH_CURRENCY_RATES",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
