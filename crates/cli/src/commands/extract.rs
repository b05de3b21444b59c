use std::path::Path;

use eorbench_core::domain::enhancement::EnhancedQuote;
use eorbench_core::pricing::{extract_with_source, transform_to_quote, PriceSource};
use eorbench_core::{ProviderId, Quote};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::commands::{load_config, read_json, CommandResult};

const COMMAND: &str = "extract";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Extraction {
    provider: ProviderId,
    monthly_total: Decimal,
    source: PriceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote: Option<Quote>,
}

pub fn run(
    provider: &str,
    input: &Path,
    enhancement: Option<&Path>,
    contract_months: Option<u32>,
) -> CommandResult {
    let provider = match provider.parse::<ProviderId>() {
        Ok(provider) => provider,
        Err(error) => return CommandResult::failure(COMMAND, "unknown_provider", error.to_string(), 2),
    };
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let raw: Value = match read_json(COMMAND, input) {
        Ok(raw) => raw,
        Err(failure) => return failure,
    };
    let enhancement: Option<EnhancedQuote> = match enhancement.map(|path| read_json(COMMAND, path)) {
        Some(Ok(enhancement)) => Some(enhancement),
        Some(Err(failure)) => return failure,
        None => None,
    };

    let contract_months = contract_months.unwrap_or(config.reconciliation.contract_months);
    if contract_months == 0 {
        return CommandResult::failure(
            COMMAND,
            "malformed_input",
            "--contract-months must be at least 1",
            2,
        );
    }

    let Some(price) =
        extract_with_source(provider, &raw, enhancement.as_ref(), i64::from(contract_months))
    else {
        return CommandResult::failure(
            COMMAND,
            "unextractable_price",
            format!("no positive monthly price found in the {provider} payload"),
            1,
        );
    };

    let extraction = Extraction {
        provider,
        monthly_total: price.amount,
        source: price.source,
        quote: transform_to_quote(provider, &raw),
    };
    CommandResult::success_with_data(
        COMMAND,
        format!("{provider} monthly total {} ({})", price.amount, price.source.label()),
        &extraction,
    )
}
