//! Boundary to the currency-conversion collaborator.
//!
//! The engine never converts on its own. Everything goes through a
//! [`CurrencyConverter`], and callers use [`convert`] / [`convert_all`] so the
//! same-currency short circuit and the fail-fast join are applied uniformly.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::CurrencyConfig;
use crate::reference::same_currency;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("currency conversion {from}->{to} failed: {message}")]
    Failed { from: String, to: String, message: String },
    #[error("currency conversion {from}->{to} returned invalid amount {amount}")]
    InvalidResult { from: String, to: String, amount: Decimal },
}

impl ConversionError {
    pub fn failed(from: &str, to: &str, message: impl Into<String>) -> Self {
        Self::Failed { from: from.to_string(), to: to.to_string(), message: message.into() }
    }
}

#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    async fn convert_amount(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Decimal, ConversionError>;
}

/// Converts `amount`, returning it untouched when both codes match
/// (case-insensitive) without calling the converter.
pub async fn convert<C>(
    converter: &C,
    amount: Decimal,
    from: &str,
    to: &str,
) -> Result<Decimal, ConversionError>
where
    C: CurrencyConverter + ?Sized,
{
    if same_currency(from, to) {
        return Ok(amount);
    }

    let converted = converter.convert_amount(amount, from, to).await?;
    if amount >= Decimal::ZERO && converted < Decimal::ZERO {
        return Err(ConversionError::InvalidResult {
            from: from.to_string(),
            to: to.to_string(),
            amount: converted,
        });
    }
    Ok(converted)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionRequest {
    pub amount: Decimal,
    pub from: String,
    pub to: String,
}

impl ConversionRequest {
    pub fn new(amount: Decimal, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { amount, from: from.into(), to: to.into() }
    }
}

/// Issues every conversion concurrently and joins them. Results keep request
/// order; the first failure fails the whole batch.
pub async fn convert_all<C>(
    converter: &C,
    requests: &[ConversionRequest],
) -> Result<Vec<Decimal>, ConversionError>
where
    C: CurrencyConverter + ?Sized,
{
    try_join_all(
        requests
            .iter()
            .map(|request| convert(converter, request.amount, &request.from, &request.to)),
    )
    .await
}

/// Converter backed by a static rate table expressed as units of each
/// currency per one unit of `base`.
#[derive(Clone, Debug)]
pub struct FixedRateConverter {
    base: String,
    rates: BTreeMap<String, Decimal>,
}

impl FixedRateConverter {
    pub fn new(base: impl Into<String>, rates: BTreeMap<String, Decimal>) -> Self {
        let rates = rates.into_iter().map(|(code, rate)| (code.to_ascii_uppercase(), rate)).collect();
        Self { base: base.into().to_ascii_uppercase(), rates }
    }

    pub fn from_config(config: &CurrencyConfig) -> Self {
        Self::new(config.base.clone(), config.rates.clone())
    }

    fn rate(&self, code: &str) -> Option<Decimal> {
        let code = code.trim().to_ascii_uppercase();
        if code == self.base {
            return Some(Decimal::ONE);
        }
        self.rates.get(&code).copied().filter(|rate| *rate > Decimal::ZERO)
    }
}

#[async_trait]
impl CurrencyConverter for FixedRateConverter {
    async fn convert_amount(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Decimal, ConversionError> {
        let from_rate = self
            .rate(from)
            .ok_or_else(|| ConversionError::failed(from, to, format!("no rate for `{from}`")))?;
        let to_rate = self
            .rate(to)
            .ok_or_else(|| ConversionError::failed(from, to, format!("no rate for `{to}`")))?;

        amount
            .checked_div(from_rate)
            .and_then(|in_base| in_base.checked_mul(to_rate))
            .ok_or_else(|| ConversionError::failed(from, to, "amount out of range"))
    }
}
