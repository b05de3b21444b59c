use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use eorbench_core::domain::quote::CostItem;
use eorbench_core::reconciliation::{
    AdvisorError, CategorizationRequest, CategorizedCosts, CategorizedItem, CostCategorizer,
    CostCategory,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::guardrails::{AdvisorProposal, GuardrailDecision, GuardrailPolicy};
use crate::llm::{parse_json_reply, LlmClient};

#[derive(Debug, Deserialize)]
struct CategorizerReply {
    #[serde(default)]
    items: Vec<ProposedCategory>,
}

#[derive(Debug, Deserialize)]
struct ProposedCategory {
    name: String,
    category: CostCategory,
    #[serde(default)]
    amount: Option<Decimal>,
}

/// Assigns a category to each submitted cost item. Amounts and frequencies
/// always come from the request; the model only labels.
pub struct LlmCostCategorizer {
    client: Arc<dyn LlmClient>,
    engine_id: String,
    guardrails: GuardrailPolicy,
}

impl LlmCostCategorizer {
    pub fn new(client: Arc<dyn LlmClient>, engine_id: impl Into<String>) -> Self {
        Self { client, engine_id: engine_id.into(), guardrails: GuardrailPolicy::default() }
    }
}

fn build_prompt(request: &CategorizationRequest) -> String {
    let items: Vec<_> = request
        .cost_items
        .iter()
        .map(|item| json!({"name": item.name, "amount": item.amount, "frequency": item.frequency}))
        .collect();
    format!(
        "Categorize each employer cost item for provider {provider} in {country} ({currency}).\n\
         Allowed categories: base_salary, statutory_contribution, benefit, provider_fee, \
         one_time_fee, other.\n\nITEMS:\n{items}\n\n\
         Return ONLY JSON shaped as {{\"items\": [{{\"name\": string, \"category\": string}}]}} \
         using the item names exactly as given.",
        provider = request.provider,
        country = request.country,
        currency = request.currency,
        items = serde_json::Value::Array(items),
    )
}

#[async_trait]
impl CostCategorizer for LlmCostCategorizer {
    async fn categorize_cost_items(
        &self,
        request: &CategorizationRequest,
    ) -> Result<CategorizedCosts, AdvisorError> {
        let reply = self
            .client
            .complete(&build_prompt(request))
            .await
            .map_err(|error| AdvisorError::Transport(error.to_string()))?;
        let value =
            parse_json_reply(&reply).map_err(|error| AdvisorError::InvalidResponse(error.to_string()))?;
        let reply: CategorizerReply = serde_json::from_value(value)
            .map_err(|error| AdvisorError::InvalidResponse(error.to_string()))?;

        let submitted: BTreeMap<&str, &CostItem> =
            request.cost_items.iter().map(|item| (item.name.as_str(), item)).collect();
        let mut assigned: BTreeMap<&str, CostCategory> = BTreeMap::new();

        for proposed in &reply.items {
            let proposal = match submitted.get(proposed.name.as_str()) {
                Some(item) => AdvisorProposal::Categorization {
                    item: proposed.name.clone(),
                    amount_matches: proposed.amount.map_or(true, |amount| amount == item.amount),
                },
                None => AdvisorProposal::UnknownCostItem { item: proposed.name.clone() },
            };

            match self.guardrails.evaluate(&proposal) {
                GuardrailDecision::Allow => {
                    if let Some((name, _)) = submitted.get_key_value(proposed.name.as_str()) {
                        assigned.insert(*name, proposed.category);
                    }
                }
                GuardrailDecision::Deny { reason_code, .. } => {
                    return Err(AdvisorError::Rejected(format!(
                        "{reason_code} for item `{}`",
                        proposed.name
                    )));
                }
                GuardrailDecision::Degrade { reason_code, .. } => {
                    warn!(
                        event_name = "agent.guardrail.degraded",
                        action = proposal.action_key(),
                        reason = reason_code,
                        "categorization entry ignored"
                    );
                }
            }
        }

        let items: Vec<CategorizedItem> = request
            .cost_items
            .iter()
            .map(|item| CategorizedItem {
                name: item.name.clone(),
                amount: item.amount,
                frequency: item.frequency,
                category: assigned.get(item.name.as_str()).copied().unwrap_or(CostCategory::Other),
            })
            .collect();

        info!(
            event_name = "agent.categorizer.completed",
            provider = %request.provider,
            items = items.len(),
            categorized = assigned.len(),
            "cost items categorized"
        );

        Ok(CategorizedCosts {
            provider: request.provider.clone(),
            currency: request.currency.clone(),
            items,
            engine: self.engine_id.clone(),
        })
    }
}
