use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ReconciliationConfig;
use crate::currency::CurrencyConverter;
use crate::reconciliation::advisor::ReconciliationAdvisor;
use crate::reconciliation::input::{build_input_from_enhancements, ReconciliationError};
use crate::reconciliation::local::compute_local;
use crate::reconciliation::model::{
    ReconciliationInput, ReconciliationRequest, ReconciliationResult,
};

/// Runs the local check and, when an advisor is attached, one escalation
/// round. Advisor failures never fail the run.
#[derive(Clone, Default)]
pub struct ReconciliationService {
    advisor: Option<Arc<dyn ReconciliationAdvisor>>,
}

impl ReconciliationService {
    pub fn local_only() -> Self {
        Self { advisor: None }
    }

    pub fn with_advisor(advisor: Arc<dyn ReconciliationAdvisor>) -> Self {
        Self { advisor: Some(advisor) }
    }

    pub fn has_advisor(&self) -> bool {
        self.advisor.is_some()
    }

    /// Local result, then a single advisor request carrying every flagged
    /// discrepancy and the full input. Falls back to the local result when
    /// the advisor is missing or fails.
    pub async fn reconcile(
        &self,
        input: &ReconciliationInput,
    ) -> Result<ReconciliationResult, ReconciliationError> {
        let local = compute_local(input)?;
        let Some(advisor) = self.advisor.as_ref() else {
            warn!(
                event_name = "reconciliation.advisor.missing",
                "advisor requested but none is configured; returning local result"
            );
            return Ok(local);
        };

        match advisor.recommend(input, &local).await {
            Ok(recommendations) => {
                info!(
                    event_name = "reconciliation.advisor.completed",
                    engine = advisor.engine_id(),
                    discrepancies = local.discrepancies.len(),
                    recommendations = recommendations.len(),
                    "advisor recommendations attached"
                );
                let mut result = local;
                result.recommendations = recommendations;
                result.metadata.engine = advisor.engine_id().to_string();
                Ok(result)
            }
            Err(error) => {
                warn!(
                    event_name = "reconciliation.advisor.failed",
                    engine = advisor.engine_id(),
                    error = %error,
                    "advisor failed; falling back to local result"
                );
                Ok(local)
            }
        }
    }

    /// Validates a boundary request, converts it into the target currency and
    /// reconciles it, escalating only when `use_llm` is set.
    pub async fn run<C>(
        &self,
        request: &ReconciliationRequest,
        defaults: &ReconciliationConfig,
        converter: &C,
    ) -> Result<ReconciliationResult, ReconciliationError>
    where
        C: CurrencyConverter + ?Sized,
    {
        let settings = request.settings(defaults)?;
        let input = build_input_from_enhancements(
            &request.enhancements,
            &request.target_currency,
            &settings,
            converter,
        )
        .await?;

        if request.use_llm {
            self.reconcile(&input).await
        } else {
            compute_local(&input)
        }
    }
}
