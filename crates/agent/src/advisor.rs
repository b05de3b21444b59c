use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use eorbench_core::reconciliation::{
    AdvisorError, ReconciliationAdvisor, ReconciliationInput, ReconciliationResult,
    Recommendation,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::guardrails::{AdvisorProposal, GuardrailPolicy};
use crate::llm::{parse_json_reply, LlmClient};

#[derive(Debug, Deserialize)]
struct AdvisorReply {
    #[serde(default)]
    recommendations: Vec<ProposedRecommendation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProposedRecommendation {
    #[serde(default)]
    provider: Option<String>,
    action: String,
    #[serde(default)]
    rationale: String,
    #[serde(default, alias = "adjusted_total", alias = "total")]
    adjusted_total: Option<Decimal>,
}

/// Reconciliation advisor that asks a language model for review actions.
pub struct LlmReconciliationAdvisor {
    client: Arc<dyn LlmClient>,
    engine_id: String,
    guardrails: GuardrailPolicy,
}

impl LlmReconciliationAdvisor {
    pub fn new(client: Arc<dyn LlmClient>, engine_id: impl Into<String>) -> Self {
        Self { client, engine_id: engine_id.into(), guardrails: GuardrailPolicy::default() }
    }

    fn proposal(
        &self,
        proposed: &ProposedRecommendation,
        known_providers: &BTreeSet<String>,
    ) -> AdvisorProposal {
        let provider = proposed.provider.as_deref().map(str::trim).filter(|p| !p.is_empty());
        match (provider, proposed.adjusted_total) {
            (Some(provider), _) if !known_providers.contains(&provider.to_ascii_lowercase()) => {
                AdvisorProposal::UnknownProvider { provider: provider.to_string() }
            }
            (provider, Some(requested_total)) => AdvisorProposal::PriceOverride {
                provider: provider.unwrap_or("all").to_string(),
                requested_total,
            },
            (provider, None) => AdvisorProposal::Recommendation {
                provider: provider.map(str::to_string),
                action: proposed.action.clone(),
            },
        }
    }
}

pub fn build_prompt(input: &ReconciliationInput, local: &ReconciliationResult) -> String {
    let quotes: Vec<_> = input
        .enhancements
        .iter()
        .map(|quote| {
            json!({
                "provider": quote.provider_label(),
                "baseMonthlyTotal": quote.base_quote.monthly_total,
                "breakdown": quote.monthly_cost_breakdown,
                "totalEnhancement": quote.total_enhancement,
                "finalTotal": quote.final_total,
                "addOns": quote.enhancements.len(),
            })
        })
        .collect();
    let payload = json!({
        "targetCurrency": input.target_currency,
        "threshold": input.threshold,
        "riskMode": input.risk_mode,
        "quotes": quotes,
        "discrepancies": local.discrepancies,
    });

    let mut prompt = String::new();
    prompt.push_str("Review the following employer-of-record quote reconciliation.\n");
    prompt.push_str("For each discrepancy, suggest one concrete review action.\n\n");
    prompt.push_str("DATA:\n");
    prompt.push_str(&payload.to_string());
    prompt.push_str(
        "\n\nReturn ONLY JSON shaped as {\"recommendations\": [{\"provider\": string|null, \
         \"action\": string, \"rationale\": string}]}. Do not include amounts.",
    );
    prompt
}

#[async_trait]
impl ReconciliationAdvisor for LlmReconciliationAdvisor {
    fn engine_id(&self) -> &str {
        &self.engine_id
    }

    async fn recommend(
        &self,
        input: &ReconciliationInput,
        local: &ReconciliationResult,
    ) -> Result<Vec<Recommendation>, AdvisorError> {
        let prompt = build_prompt(input, local);
        let reply = self
            .client
            .complete(&prompt)
            .await
            .map_err(|error| AdvisorError::Transport(error.to_string()))?;
        let value =
            parse_json_reply(&reply).map_err(|error| AdvisorError::InvalidResponse(error.to_string()))?;
        let reply: AdvisorReply = serde_json::from_value(value)
            .map_err(|error| AdvisorError::InvalidResponse(error.to_string()))?;

        let known_providers: BTreeSet<String> = input
            .enhancements
            .iter()
            .map(|quote| quote.provider_label().to_ascii_lowercase())
            .collect();

        let mut recommendations = Vec::new();
        for proposed in reply.recommendations {
            let proposal = self.proposal(&proposed, &known_providers);
            let decision = self.guardrails.evaluate(&proposal);
            if !decision.is_allowed() {
                warn!(
                    event_name = "agent.guardrail.blocked",
                    action = proposal.action_key(),
                    reason = decision.reason_code().unwrap_or("unknown"),
                    "advisor proposal dropped"
                );
                continue;
            }
            recommendations.push(Recommendation {
                provider: proposed.provider.filter(|provider| !provider.trim().is_empty()),
                action: proposed.action,
                rationale: proposed.rationale,
            });
            if recommendations.len() == self.guardrails.max_recommendations {
                break;
            }
        }

        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use eorbench_core::domain::enhancement::{BaseQuote, EnhancedQuote};
    use eorbench_core::reconciliation::{
        compute_local, AdvisorError, ReconciliationAdvisor, ReconciliationInput,
    };
    use rust_decimal::Decimal;

    use super::LlmReconciliationAdvisor;
    use crate::llm::LlmClient;

    struct ScriptedClient {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self { reply: Ok(reply.to_string()), prompts: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().expect("prompt lock").push(prompt.to_string());
            self.reply.clone().map_err(|message| anyhow!(message))
        }
    }

    fn input() -> ReconciliationInput {
        ReconciliationInput::new(
            vec![EnhancedQuote {
                provider: Some("deel".to_string()),
                base_quote: BaseQuote { monthly_total: Decimal::from(3000), ..BaseQuote::default() },
                total_enhancement: Some(Decimal::from(200)),
                final_total: Some(Decimal::from(3600)),
                ..EnhancedQuote::default()
            }],
            "USD",
        )
    }

    #[tokio::test]
    async fn allowed_recommendations_are_returned_and_overrides_dropped() {
        let client = ScriptedClient::replying(
            r#"{"recommendations": [
                {"provider": "deel", "action": "Ask Deel for the itemized add-ons", "rationale": "declared total is 12% above"},
                {"provider": "deel", "action": "Use 3200", "adjustedTotal": 3200},
                {"provider": "papaya", "action": "Switch providers"}
            ]}"#,
        );
        let advisor = LlmReconciliationAdvisor::new(client.clone(), "openai:test");
        let input = input();
        let local = compute_local(&input).expect("local");

        let recommendations = advisor.recommend(&input, &local).await.expect("recommendations");

        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].provider.as_deref(), Some("deel"));
        assert_eq!(recommendations[0].action, "Ask Deel for the itemized add-ons");

        let prompts = client.prompts.lock().expect("prompt lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("\"discrepancies\""));
        assert!(prompts[0].contains("\"targetCurrency\":\"USD\""));
    }

    #[tokio::test]
    async fn transport_and_parse_failures_surface_as_advisor_errors() {
        let failing = Arc::new(ScriptedClient {
            reply: Err("connection refused".to_string()),
            prompts: std::sync::Mutex::new(Vec::new()),
        });
        let input = input();
        let local = compute_local(&input).expect("local");

        let error = LlmReconciliationAdvisor::new(failing, "ollama:test")
            .recommend(&input, &local)
            .await
            .expect_err("transport failure");
        assert!(matches!(error, AdvisorError::Transport(_)));

        let garbled = ScriptedClient::replying("I think everything looks fine!");
        let error = LlmReconciliationAdvisor::new(garbled, "ollama:test")
            .recommend(&input, &local)
            .await
            .expect_err("parse failure");
        assert!(matches!(error, AdvisorError::InvalidResponse(_)));
    }
}
