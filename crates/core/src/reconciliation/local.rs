use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::enhancement::EnhancedQuote;
use crate::domain::provider::ProviderId;
use crate::pricing::addons::addon_breakdown;
use crate::pricing::extractors::enhanced_price;
use crate::reconciliation::input::ReconciliationError;
use crate::reconciliation::model::{
    Discrepancy, DiscrepancyKind, DiscrepancyTrigger, ReconciliationInput, ReconciliationMetadata,
    ReconciliationResult, LOCAL_ENGINE,
};

const RATIO_SCALE: u32 = 6;

fn out_of_range(quote: &EnhancedQuote) -> ReconciliationError {
    ReconciliationError::MalformedInput(format!(
        "{} amounts are too large to reconcile",
        quote.provider_label()
    ))
}

/// Monthly total the enhancement producer reported: `final_total`, else the
/// breakdown sum, else base plus `total_enhancement`.
pub fn declared_total(quote: &EnhancedQuote) -> Result<Option<Decimal>, ReconciliationError> {
    if let Some(final_total) = quote.final_total {
        return Ok(Some(final_total));
    }
    let declared = match (quote.monthly_cost_breakdown, quote.total_enhancement) {
        (Some(breakdown), _) => breakdown.total(),
        (None, Some(enhancement)) => quote.base_quote.monthly_total.checked_add(enhancement),
        (None, None) => return Ok(None),
    };
    declared.map(Some).ok_or_else(|| out_of_range(quote))
}

/// Monthly total rebuilt from the base quote.
///
/// Itemized add-ons are summed with the shared add-on rules whatever the
/// provider label says. Without items, known providers use the same figures
/// as the price extractors and unknown ones fall back to the breakdown, then
/// base plus `total_enhancement`, then the base alone.
pub fn recomputed_total(
    quote: &EnhancedQuote,
    contract_months: i64,
) -> Result<Decimal, ReconciliationError> {
    let base = quote.base_quote.monthly_total;
    let recomputed = if !quote.enhancements.is_empty() {
        addon_breakdown(quote, contract_months)
            .and_then(|add_ons| add_ons.total())
            .and_then(|add_ons| base.checked_add(add_ons))
    } else {
        match quote.provider_label().parse::<ProviderId>() {
            Ok(provider) => {
                enhanced_price(provider, quote, contract_months).map(|price| price.amount)
            }
            Err(_) => match (quote.monthly_cost_breakdown, quote.total_enhancement) {
                (Some(breakdown), _) => breakdown.total(),
                (None, Some(enhancement)) => base.checked_add(enhancement),
                (None, None) => Some(base),
            },
        }
    };
    recomputed.ok_or_else(|| out_of_range(quote))
}

fn check(
    input: &ReconciliationInput,
    quote: &EnhancedQuote,
    kind: DiscrepancyKind,
    declared: Decimal,
    recomputed: Decimal,
) -> Result<Option<Discrepancy>, ReconciliationError> {
    let difference = recomputed.checked_sub(declared).ok_or_else(|| out_of_range(quote))?;
    let magnitude = difference.abs();
    let ratio = magnitude / declared.abs().max(Decimal::ONE);

    let mut triggers = Vec::new();
    if ratio > input.threshold {
        triggers.push(DiscrepancyTrigger::RelativeThreshold);
    }
    if input.risk_mode && magnitude > input.risk_absolute_floor {
        triggers.push(DiscrepancyTrigger::AbsoluteFloor);
    }
    if triggers.is_empty() {
        return Ok(None);
    }

    Ok(Some(Discrepancy {
        provider: quote.provider_label().to_string(),
        kind,
        declared,
        recomputed,
        difference,
        ratio: ratio.round_dp(RATIO_SCALE),
        triggers,
    }))
}

/// Checks every quote against the input's tolerance without any advisor.
///
/// Discrepancies are data; the only error is a quote whose amounts are too
/// large to add up.
pub fn compute_local(
    input: &ReconciliationInput,
) -> Result<ReconciliationResult, ReconciliationError> {
    let months = i64::from(input.contract_months);
    let mut discrepancies = Vec::new();

    for quote in &input.enhancements {
        if let Some(breakdown) = quote.monthly_cost_breakdown {
            discrepancies.extend(check(
                input,
                quote,
                DiscrepancyKind::Base,
                breakdown.base_cost,
                quote.base_quote.monthly_total,
            )?);
        }

        if let Some(declared) = declared_total(quote)? {
            discrepancies.extend(check(
                input,
                quote,
                DiscrepancyKind::Total,
                declared,
                recomputed_total(quote, months)?,
            )?);
        }
    }

    info!(
        event_name = "reconciliation.local.completed",
        quotes = input.enhancements.len(),
        discrepancies = discrepancies.len(),
        threshold = %input.threshold,
        risk_mode = input.risk_mode,
        currency = %input.target_currency,
        "local reconciliation completed"
    );

    Ok(ReconciliationResult {
        discrepancies,
        recommendations: Vec::new(),
        metadata: ReconciliationMetadata {
            threshold: input.threshold,
            risk_mode: input.risk_mode,
            currency: input.target_currency.clone(),
            generated_at: Utc::now(),
            engine: LOCAL_ENGINE.to_string(),
        },
    })
}
