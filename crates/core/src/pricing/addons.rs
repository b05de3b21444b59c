use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::enhancement::EnhancedQuote;
use crate::domain::provider::ProviderId;
use crate::domain::quote::Frequency;

/// Monthly-equivalent split of an enhancement's itemized add-ons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnBreakdown {
    pub recurring: Decimal,
    pub amortized_one_time: Decimal,
    pub skipped_included: usize,
}

impl AddOnBreakdown {
    pub fn total(&self) -> Option<Decimal> {
        self.recurring.checked_add(self.amortized_one_time)
    }
}

/// Splits add-ons into recurring and amortized one-time parts. One-time items
/// are spread over `contract_months`, clamped to at least one month. Items the
/// base quote already contains and non-positive amounts contribute nothing.
/// Returns `None` when a running sum does not fit a `Decimal`.
pub fn addon_breakdown(
    enhancement: &EnhancedQuote,
    contract_months: i64,
) -> Option<AddOnBreakdown> {
    let mut breakdown = AddOnBreakdown::default();

    for item in &enhancement.enhancements {
        if item.already_included {
            breakdown.skipped_included += 1;
            continue;
        }
        if item.amount <= Decimal::ZERO {
            continue;
        }

        let monthly = item.frequency.monthly_equivalent(item.amount, contract_months);
        let bucket = match item.frequency {
            Frequency::Monthly => &mut breakdown.recurring,
            Frequency::OneTime => &mut breakdown.amortized_one_time,
        };
        *bucket = bucket.checked_add(monthly)?;
    }

    Some(breakdown)
}

/// Monthly-equivalent cost of the enhancement's add-ons for `provider`.
/// Providers without a mapped enhancement schema contribute zero; `None`
/// means the add-ons are too large to sum.
pub fn compute_enhancement_addons(
    provider: &str,
    enhancement: &EnhancedQuote,
    contract_months: i64,
) -> Option<Decimal> {
    match provider.parse::<ProviderId>() {
        Ok(_) => addon_breakdown(enhancement, contract_months)?.total(),
        Err(error) => {
            debug!(
                event_name = "pricing.addons.unsupported_provider",
                provider = %provider,
                error = %error,
                "enhancement add-ons ignored for unsupported provider"
            );
            Some(Decimal::ZERO)
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{addon_breakdown, compute_enhancement_addons};
    use crate::domain::enhancement::{BaseQuote, EnhancedQuote, EnhancementItem};
    use crate::domain::quote::Frequency;

    fn item(name: &str, amount: i64, frequency: Frequency, already_included: bool) -> EnhancementItem {
        EnhancementItem {
            name: name.to_string(),
            amount: Decimal::from(amount),
            frequency,
            already_included,
        }
    }

    fn enhancement(items: Vec<EnhancementItem>) -> EnhancedQuote {
        EnhancedQuote {
            provider: Some("deel".to_string()),
            base_quote: BaseQuote { monthly_total: Decimal::from(3000), ..BaseQuote::default() },
            enhancements: items,
            ..EnhancedQuote::default()
        }
    }

    #[test]
    fn one_time_items_amortize_over_contract() {
        let enhanced = enhancement(vec![item("Severance reserve", 1200, Frequency::OneTime, false)]);

        assert_eq!(compute_enhancement_addons("deel", &enhanced, 12), Some(Decimal::from(100)));
        assert_eq!(compute_enhancement_addons("deel", &enhanced, 24), Some(Decimal::from(50)));
    }

    #[test]
    fn non_positive_contract_length_clamps_to_one_month() {
        let enhanced = enhancement(vec![item("Visa", 900, Frequency::OneTime, false)]);

        assert_eq!(compute_enhancement_addons("remote", &enhanced, 0), Some(Decimal::from(900)));
        assert_eq!(compute_enhancement_addons("remote", &enhanced, -3), Some(Decimal::from(900)));
    }

    #[test]
    fn recurring_items_count_in_full_and_included_items_are_skipped() {
        let enhanced = enhancement(vec![
            item("Health insurance", 250, Frequency::Monthly, false),
            item("13th salary accrual", 250, Frequency::Monthly, true),
            item("Laptop", 1800, Frequency::OneTime, false),
            item("Refund", -40, Frequency::Monthly, false),
        ]);

        let breakdown = addon_breakdown(&enhanced, 12).expect("sums fit");
        assert_eq!(breakdown.recurring, Decimal::from(250));
        assert_eq!(breakdown.amortized_one_time, Decimal::from(150));
        assert_eq!(breakdown.skipped_included, 1);
        assert_eq!(
            compute_enhancement_addons("Velocity Global", &enhanced, 12),
            Some(Decimal::from(400))
        );
    }

    #[test]
    fn unknown_provider_contributes_zero() {
        let enhanced = enhancement(vec![item("Meal vouchers", 120, Frequency::Monthly, false)]);
        assert_eq!(compute_enhancement_addons("papaya", &enhanced, 12), Some(Decimal::ZERO));
    }

    #[test]
    fn add_ons_too_large_to_sum_yield_none() {
        let mut enhanced = enhancement(Vec::new());
        enhanced.enhancements = ["Relocation", "Equity top-up"]
            .into_iter()
            .map(|name| EnhancementItem {
                name: name.to_string(),
                amount: Decimal::MAX,
                frequency: Frequency::Monthly,
                already_included: false,
            })
            .collect();

        assert_eq!(addon_breakdown(&enhanced, 12), None);
        assert_eq!(compute_enhancement_addons("oyster", &enhanced, 12), None);
    }
}
