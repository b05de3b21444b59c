use rust_decimal::Decimal;

/// Something a model response asks the engine to accept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdvisorProposal {
    Recommendation { provider: Option<String>, action: String },
    PriceOverride { provider: String, requested_total: Decimal },
    UnknownProvider { provider: String },
    Categorization { item: String, amount_matches: bool },
    UnknownCostItem { item: String },
}

impl AdvisorProposal {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::Recommendation { .. } => "advisor.recommendation",
            Self::PriceOverride { .. } => "policy.price_override",
            Self::UnknownProvider { .. } => "advisor.unknown_provider",
            Self::Categorization { .. } => "categorizer.assign_category",
            Self::UnknownCostItem { .. } => "categorizer.unknown_item",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

impl GuardrailDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason_code, .. } | Self::Degrade { reason_code, .. } => Some(*reason_code),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub llm_can_set_prices: bool,
    pub advisory_enabled: bool,
    pub max_recommendations: usize,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { llm_can_set_prices: false, advisory_enabled: true, max_recommendations: 20 }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(&self, proposal: &AdvisorProposal) -> GuardrailDecision {
        match proposal {
            AdvisorProposal::Recommendation { .. } if self.advisory_enabled => {
                GuardrailDecision::Allow
            }
            AdvisorProposal::Recommendation { .. } => GuardrailDecision::Degrade {
                reason_code: "advisory_disabled",
                user_message: "Model recommendations are disabled. Showing the local result only."
                    .to_string(),
                fallback_path: "local_reconciliation",
            },
            AdvisorProposal::PriceOverride { .. } => GuardrailDecision::Deny {
                reason_code: if self.llm_can_set_prices {
                    "price_override_policy_conflict"
                } else {
                    "price_override_disallowed"
                },
                user_message:
                    "Model output cannot set or override totals. Totals come from deterministic reconciliation."
                        .to_string(),
                fallback_path: "local_reconciliation",
            },
            AdvisorProposal::UnknownProvider { .. } => GuardrailDecision::Deny {
                reason_code: "unknown_provider_reference",
                user_message: "The recommendation referenced a provider that was not reconciled."
                    .to_string(),
                fallback_path: "local_reconciliation",
            },
            AdvisorProposal::Categorization { amount_matches: true, .. } => GuardrailDecision::Allow,
            AdvisorProposal::Categorization { .. } => GuardrailDecision::Deny {
                reason_code: "categorization_amount_mismatch",
                user_message: "The categorization changed a cost amount and was discarded."
                    .to_string(),
                fallback_path: "uncategorized_costs",
            },
            AdvisorProposal::UnknownCostItem { .. } => GuardrailDecision::Degrade {
                reason_code: "unknown_cost_item",
                user_message: "The categorization mentioned a cost item that was not submitted."
                    .to_string(),
                fallback_path: "ignore_item",
            },
        }
    }
}
