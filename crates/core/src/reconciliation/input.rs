use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::config::{is_currency_code, ReconciliationConfig};
use crate::currency::{convert_all, ConversionError, ConversionRequest, CurrencyConverter};
use crate::domain::enhancement::EnhancedQuote;
use crate::errors::{ApplicationError, DomainError};
use crate::reconciliation::model::{ReconciliationInput, ReconciliationRequest};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error("malformed reconciliation request: {0}")]
    MalformedInput(String),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl From<ReconciliationError> for ApplicationError {
    fn from(value: ReconciliationError) -> Self {
        match value {
            ReconciliationError::MalformedInput(message) => {
                Self::Domain(DomainError::MalformedInput(message))
            }
            ReconciliationError::Conversion(error) => Self::Conversion(error),
        }
    }
}

impl ReconciliationRequest {
    /// Resolves request options against configured defaults, rejecting
    /// malformed values before any collaborator is called.
    pub fn settings(
        &self,
        defaults: &ReconciliationConfig,
    ) -> Result<ReconciliationConfig, ReconciliationError> {
        let target = self.target_currency.trim();
        if target.is_empty() {
            return Err(ReconciliationError::MalformedInput(
                "targetCurrency is required".to_string(),
            ));
        }
        if !is_currency_code(target) {
            return Err(ReconciliationError::MalformedInput(format!(
                "targetCurrency `{target}` is not an ISO 4217 code"
            )));
        }

        let threshold = self.threshold.unwrap_or(defaults.threshold);
        if threshold < Decimal::ZERO || threshold > Decimal::ONE {
            return Err(ReconciliationError::MalformedInput(format!(
                "threshold {threshold} must be between 0 and 1"
            )));
        }

        let contract_months = self.contract_months.unwrap_or(defaults.contract_months);
        if contract_months == 0 {
            return Err(ReconciliationError::MalformedInput(
                "contractMonths must be at least 1".to_string(),
            ));
        }

        Ok(ReconciliationConfig {
            threshold,
            risk_mode: self.risk_mode.unwrap_or(defaults.risk_mode),
            risk_absolute_floor: defaults.risk_absolute_floor,
            contract_months,
        })
    }
}

/// Every money field of an enhanced quote, in a fixed order.
fn monetary_fields_mut(quote: &mut EnhancedQuote) -> Vec<&mut Decimal> {
    let mut fields = vec![&mut quote.base_quote.monthly_total];
    fields.extend(quote.base_quote.items.iter_mut().map(|item| &mut item.amount));
    if let Some(breakdown) = quote.monthly_cost_breakdown.as_mut() {
        fields.push(&mut breakdown.base_cost);
        fields.push(&mut breakdown.enhancements);
    }
    fields.extend(quote.total_enhancement.as_mut());
    fields.extend(quote.enhancements.iter_mut().map(|item| &mut item.amount));
    fields.extend(quote.final_total.as_mut());
    fields
}

fn source_currency<'a>(quote: &'a EnhancedQuote, target: &'a str) -> &'a str {
    quote
        .currency
        .as_deref()
        .or(quote.base_quote.currency.as_deref())
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .unwrap_or(target)
}

/// Converts every money field of every quote into `target_currency`.
///
/// All conversions are issued at once and joined; one failure fails the
/// build. Quotes without a currency are taken to be in the target already.
pub async fn build_input_from_enhancements<C>(
    enhancements: &[EnhancedQuote],
    target_currency: &str,
    settings: &ReconciliationConfig,
    converter: &C,
) -> Result<ReconciliationInput, ReconciliationError>
where
    C: CurrencyConverter + ?Sized,
{
    let target = target_currency.trim().to_ascii_uppercase();
    if target.is_empty() {
        return Err(ReconciliationError::MalformedInput("targetCurrency is required".to_string()));
    }

    let mut quotes = enhancements.to_vec();
    let mut requests = Vec::new();
    for quote in &mut quotes {
        let from = source_currency(quote, &target).to_string();
        for amount in monetary_fields_mut(quote) {
            requests.push(ConversionRequest::new(*amount, from.clone(), target.clone()));
        }
    }

    debug!(
        event_name = "reconciliation.input.converting",
        quotes = quotes.len(),
        conversions = requests.len(),
        target_currency = %target,
        "converting enhancement amounts"
    );

    let mut converted = convert_all(converter, &requests).await?.into_iter();
    for quote in &mut quotes {
        for field in monetary_fields_mut(quote) {
            if let Some(amount) = converted.next() {
                *field = amount;
            }
        }
        quote.currency = Some(target.clone());
        quote.base_quote.currency = Some(target.clone());
    }

    Ok(ReconciliationInput::new(quotes, target).with_settings(settings))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::{build_input_from_enhancements, ReconciliationError};
    use crate::config::ReconciliationConfig;
    use crate::currency::FixedRateConverter;
    use crate::domain::enhancement::{BaseQuote, EnhancedQuote, MonthlyCostBreakdown};
    use crate::errors::{ApplicationError, DomainError};
    use crate::reconciliation::model::ReconciliationRequest;

    fn converter() -> FixedRateConverter {
        FixedRateConverter::new("USD", BTreeMap::from([("EUR".to_string(), Decimal::new(5, 1))]))
    }

    #[tokio::test]
    async fn converts_every_money_field_into_the_target_currency() {
        let quote = EnhancedQuote {
            provider: Some("deel".to_string()),
            currency: Some("eur".to_string()),
            base_quote: BaseQuote { monthly_total: Decimal::from(1000), ..BaseQuote::default() },
            monthly_cost_breakdown: Some(MonthlyCostBreakdown {
                base_cost: Decimal::from(1000),
                enhancements: Decimal::from(50),
            }),
            final_total: Some(Decimal::from(1050)),
            ..EnhancedQuote::default()
        };
        let untagged = EnhancedQuote {
            provider: Some("remote".to_string()),
            base_quote: BaseQuote { monthly_total: Decimal::from(700), ..BaseQuote::default() },
            ..EnhancedQuote::default()
        };

        let input = build_input_from_enhancements(
            &[quote, untagged],
            "usd",
            &ReconciliationConfig::default(),
            &converter(),
        )
        .await
        .expect("input should build");

        assert_eq!(input.target_currency, "USD");
        let deel = &input.enhancements[0];
        assert_eq!(deel.base_quote.monthly_total, Decimal::from(2000));
        assert_eq!(deel.final_total, Some(Decimal::from(2100)));
        assert_eq!(deel.monthly_cost_breakdown.map(|b| b.enhancements), Some(Decimal::from(100)));
        assert_eq!(deel.currency.as_deref(), Some("USD"));
        assert_eq!(input.enhancements[1].base_quote.monthly_total, Decimal::from(700));
    }

    #[tokio::test]
    async fn one_failed_conversion_fails_the_build() {
        let quote = EnhancedQuote {
            currency: Some("JPY".to_string()),
            ..EnhancedQuote::default()
        };

        let result = build_input_from_enhancements(
            &[quote],
            "USD",
            &ReconciliationConfig::default(),
            &converter(),
        )
        .await;

        assert!(matches!(result, Err(ReconciliationError::Conversion(_))));
    }

    #[test]
    fn request_settings_validate_and_fall_back_to_defaults() {
        let defaults = ReconciliationConfig::default();

        let request = ReconciliationRequest {
            target_currency: "EUR".to_string(),
            risk_mode: Some(true),
            ..ReconciliationRequest::default()
        };
        let settings = request.settings(&defaults).expect("valid request");
        assert_eq!(settings.threshold, defaults.threshold);
        assert!(settings.risk_mode);

        let missing = ReconciliationRequest::default().settings(&defaults);
        assert!(matches!(missing, Err(ReconciliationError::MalformedInput(_))));

        let out_of_range = ReconciliationRequest {
            target_currency: "EUR".to_string(),
            threshold: Some(Decimal::new(15, 1)),
            ..ReconciliationRequest::default()
        }
        .settings(&defaults)
        .expect_err("threshold above one");
        assert!(matches!(
            ApplicationError::from(out_of_range),
            ApplicationError::Domain(DomainError::MalformedInput(_))
        ));
    }
}
