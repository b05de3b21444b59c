use std::path::Path;
use std::sync::Arc;

use eorbench_agent::{HttpLlmClient, LlmReconciliationAdvisor};
use eorbench_core::config::AppConfig;
use eorbench_core::reconciliation::{ReconciliationError, ReconciliationRequest, ReconciliationService};
use eorbench_core::FixedRateConverter;

use crate::commands::{block_on, load_config, read_json, CommandResult};

const COMMAND: &str = "reconcile";

pub fn run(input: &Path, use_llm: bool) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let mut request: ReconciliationRequest = match read_json(COMMAND, input) {
        Ok(request) => request,
        Err(failure) => return failure,
    };
    request.use_llm |= use_llm;

    let service = match service_for(&config, request.use_llm) {
        Ok(service) => service,
        Err(failure) => return failure,
    };
    let converter = FixedRateConverter::from_config(&config.currency);

    let outcome = match block_on(
        COMMAND,
        service.run(&request, &config.reconciliation, &converter),
    ) {
        Ok(outcome) => outcome,
        Err(failure) => return failure,
    };

    match outcome {
        Ok(result) => {
            let message = format!(
                "{} discrepancies across {} quotes ({})",
                result.discrepancies.len(),
                request.enhancements.len(),
                result.metadata.engine
            );
            CommandResult::success_with_data(COMMAND, message, &result)
        }
        Err(ReconciliationError::MalformedInput(message)) => {
            CommandResult::failure(COMMAND, "malformed_input", message, 2)
        }
        Err(ReconciliationError::Conversion(error)) => {
            CommandResult::failure(COMMAND, "conversion_failure", error.to_string(), 4)
        }
    }
}

/// Advisor-backed service when the run asks for it and an llm is configured.
fn service_for(config: &AppConfig, use_llm: bool) -> Result<ReconciliationService, CommandResult> {
    if !use_llm || !config.llm.enabled {
        return Ok(ReconciliationService::local_only());
    }
    let client = HttpLlmClient::from_config(&config.llm)
        .map_err(|error| CommandResult::failure(COMMAND, "llm_config", error.to_string(), 2))?;
    let engine_id = client.engine_id();
    let advisor = LlmReconciliationAdvisor::new(Arc::new(client), engine_id);
    Ok(ReconciliationService::with_advisor(Arc::new(advisor)))
}
