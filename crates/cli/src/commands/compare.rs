use std::path::Path;

use eorbench_core::pricing::{compare_providers, ProviderQuoteInput};
use serde::Deserialize;

use crate::commands::{load_config, read_json, CommandResult};

const COMMAND: &str = "compare";

/// Either `{quotes, contractMonths?}` or a bare array of quotes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompareInput {
    Batch {
        quotes: Vec<ProviderQuoteInput>,
        #[serde(default, rename = "contractMonths")]
        contract_months: Option<u32>,
    },
    Quotes(Vec<ProviderQuoteInput>),
}

pub fn run(input: &Path, contract_months: Option<u32>) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let (quotes, file_months) = match read_json(COMMAND, input) {
        Ok(CompareInput::Batch { quotes, contract_months }) => (quotes, contract_months),
        Ok(CompareInput::Quotes(quotes)) => (quotes, None),
        Err(failure) => return failure,
    };

    if quotes.is_empty() {
        return CommandResult::failure(COMMAND, "malformed_input", "no quotes to compare", 2);
    }
    let contract_months =
        contract_months.or(file_months).unwrap_or(config.reconciliation.contract_months);
    if contract_months == 0 {
        return CommandResult::failure(
            COMMAND,
            "malformed_input",
            "contract months must be at least 1",
            2,
        );
    }

    let comparison = match compare_providers(&quotes, i64::from(contract_months)) {
        Ok(comparison) => comparison,
        Err(error) => {
            return CommandResult::failure(COMMAND, "malformed_input", error.to_string(), 2)
        }
    };
    let message = match comparison.cheapest() {
        Some(cheapest) => format!(
            "{} ranked, {} excluded; cheapest is {} at {} per month",
            comparison.ranked.len(),
            comparison.excluded.len(),
            cheapest.provider,
            cheapest.monthly_total
        ),
        None => format!("no comparable prices; {} excluded", comparison.excluded.len()),
    };
    CommandResult::success_with_data(COMMAND, message, &comparison)
}
