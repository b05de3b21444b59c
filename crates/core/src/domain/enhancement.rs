use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::{CostItem, Frequency};

/// The provider's own figures before any enhancement is layered on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseQuote {
    pub monthly_total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<CostItem>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCostBreakdown {
    pub base_cost: Decimal,
    pub enhancements: Decimal,
}

impl MonthlyCostBreakdown {
    /// `None` when the sum does not fit a `Decimal`.
    pub fn total(&self) -> Option<Decimal> {
        self.base_cost.checked_add(self.enhancements)
    }
}

/// One add-on layered on top of a base quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementItem {
    pub name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub frequency: Frequency,
    /// The provider's base quote already contains this item.
    #[serde(default)]
    pub already_included: bool,
}

/// A provider quote annotated with a computed enhancement breakdown.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedQuote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub base_quote: BaseQuote,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_cost_breakdown: Option<MonthlyCostBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_enhancement: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enhancements: Vec<EnhancementItem>,
    /// Monthly total reported by whoever produced the enhancement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_total: Option<Decimal>,
}

impl EnhancedQuote {
    pub fn provider_label(&self) -> &str {
        self.provider.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{EnhancedQuote, MonthlyCostBreakdown};
    use crate::domain::quote::Frequency;

    #[test]
    fn minimal_boundary_payload_deserializes() {
        let enhanced: EnhancedQuote = serde_json::from_value(json!({
            "baseQuote": {"monthlyTotal": 2000},
            "monthlyCostBreakdown": {"baseCost": 2000, "enhancements": 150}
        }))
        .expect("enhanced quote should deserialize");

        let breakdown = enhanced.monthly_cost_breakdown.expect("breakdown");
        assert_eq!(breakdown.total(), Some(Decimal::from(2150)));
        assert_eq!(enhanced.provider_label(), "unknown");
        assert!(enhanced.enhancements.is_empty());
    }

    #[test]
    fn itemized_enhancements_default_to_monthly_and_not_included() {
        let enhanced: EnhancedQuote = serde_json::from_value(json!({
            "provider": "remote",
            "baseQuote": {"monthlyTotal": "3100.00"},
            "enhancements": [
                {"name": "Termination provision", "amount": 1200, "frequency": "one_time"},
                {"name": "Home office", "amount": 50}
            ]
        }))
        .expect("enhanced quote should deserialize");

        assert_eq!(enhanced.enhancements[0].frequency, Frequency::OneTime);
        assert_eq!(enhanced.enhancements[1].frequency, Frequency::Monthly);
        assert!(!enhanced.enhancements[1].already_included);
    }

    #[test]
    fn breakdown_total_is_none_when_it_does_not_fit() {
        let breakdown =
            MonthlyCostBreakdown { base_cost: Decimal::MAX, enhancements: Decimal::MAX };
        assert_eq!(breakdown.total(), None);
    }
}
