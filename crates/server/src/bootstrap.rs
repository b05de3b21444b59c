use std::sync::Arc;

use eorbench_agent::{HttpLlmClient, LlmCostCategorizer, LlmReconciliationAdvisor};
use eorbench_core::config::AppConfig;
use eorbench_core::reconciliation::{CostCategorizer, ReconciliationService};
use eorbench_core::FixedRateConverter;
use thiserror::Error;
use tracing::info;

use crate::api::AppState;
use crate::health::HealthState;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
    pub health: HealthState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("llm client setup failed: {0}")]
    Llm(String),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let converter = Arc::new(FixedRateConverter::from_config(&config.currency));

    let (reconciliation, categorizer, advisor_engine) = if config.llm.enabled {
        let client = HttpLlmClient::from_config(&config.llm)
            .map_err(|error| BootstrapError::Llm(error.to_string()))?;
        let engine_id = client.engine_id();
        let client = Arc::new(client);
        let advisor = LlmReconciliationAdvisor::new(client.clone(), engine_id.clone());
        let categorizer: Arc<dyn CostCategorizer> =
            Arc::new(LlmCostCategorizer::new(client, engine_id.clone()));

        info!(
            event_name = "system.bootstrap.llm_configured",
            correlation_id = "bootstrap",
            engine = %engine_id,
            "llm advisor and categorizer configured"
        );
        (ReconciliationService::with_advisor(Arc::new(advisor)), Some(categorizer), Some(engine_id))
    } else {
        info!(
            event_name = "system.bootstrap.local_only",
            correlation_id = "bootstrap",
            "llm disabled; reconciliation runs local-only"
        );
        (ReconciliationService::local_only(), None, None)
    };

    let health = HealthState { advisor_engine, categorizer_enabled: categorizer.is_some() };
    let state = AppState {
        settings: config.reconciliation.clone(),
        reconciliation,
        converter,
        categorizer,
    };

    Ok(Application { config, state, health })
}
