use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::domain::enhancement::EnhancedQuote;
use crate::domain::provider::ProviderId;
use crate::domain::quote::ANNUAL_MONTHS;
use crate::errors::DomainError;
use crate::pricing::extractors::{extract_with_source, PriceSource};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuoteInput {
    pub provider: String,
    #[serde(default)]
    pub raw: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<EnhancedQuote>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProvider {
    pub rank: usize,
    pub provider: ProviderId,
    pub monthly_total: Decimal,
    pub annual_total: Decimal,
    pub source: PriceSource,
    pub delta_from_cheapest: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    UnknownProvider,
    UnextractablePrice,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedProvider {
    pub provider: String,
    pub reason: ExclusionReason,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderComparison {
    pub ranked: Vec<RankedProvider>,
    pub excluded: Vec<ExcludedProvider>,
}

impl ProviderComparison {
    pub fn cheapest(&self) -> Option<&RankedProvider> {
        self.ranked.first()
    }
}

/// Ranks providers by comparable monthly price, cheapest first. Equal prices
/// keep a stable provider order. Entries without an extractable price are
/// reported as excluded and never ranked as free. A price whose annual total
/// does not fit a `Decimal` rejects the whole comparison.
pub fn compare_providers(
    inputs: &[ProviderQuoteInput],
    contract_months: i64,
) -> Result<ProviderComparison, DomainError> {
    let mut priced = Vec::with_capacity(inputs.len());
    let mut excluded = Vec::new();

    for input in inputs {
        let Ok(provider) = input.provider.parse::<ProviderId>() else {
            excluded.push(ExcludedProvider {
                provider: input.provider.clone(),
                reason: ExclusionReason::UnknownProvider,
            });
            continue;
        };

        match extract_with_source(provider, &input.raw, input.enhancement.as_ref(), contract_months)
        {
            Some(price) => priced.push((provider, price)),
            None => excluded.push(ExcludedProvider {
                provider: provider.as_str().to_string(),
                reason: ExclusionReason::UnextractablePrice,
            }),
        }
    }

    priced.sort_by(|(left_id, left), (right_id, right)| {
        left.amount.cmp(&right.amount).then_with(|| left_id.cmp(right_id))
    });

    let cheapest = priced.first().map(|(_, price)| price.amount).unwrap_or_default();
    let ranked = priced
        .into_iter()
        .enumerate()
        .map(|(index, (provider, price))| {
            let annual_total =
                price.amount.checked_mul(Decimal::from(ANNUAL_MONTHS)).ok_or_else(|| {
                    DomainError::MalformedInput(format!(
                        "{provider} monthly total {} is out of range",
                        price.amount
                    ))
                })?;
            Ok(RankedProvider {
                rank: index + 1,
                provider,
                monthly_total: price.amount,
                annual_total,
                source: price.source,
                delta_from_cheapest: price.amount - cheapest,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    info!(
        event_name = "pricing.compare.completed",
        ranked = ranked.len(),
        excluded = excluded.len(),
        cheapest = ranked.first().map(|entry| entry.provider.as_str()).unwrap_or("none"),
        "provider comparison completed"
    );

    Ok(ProviderComparison { ranked, excluded })
}
