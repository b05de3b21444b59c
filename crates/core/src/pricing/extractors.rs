//! Per-provider extraction of one comparable monthly price.
//!
//! Without an enhancement record each provider runs an ordered candidate
//! chain: its known total fields, then a provider-specific reconstruction
//! from components, then a full payload-to-quote transform. The first
//! strictly positive candidate wins. With an enhancement record the raw
//! payload is ignored and the shared enhancement math decides the price, so
//! every provider is compared with identical add-on rules.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::enhancement::EnhancedQuote;
use crate::domain::provider::ProviderId;
use crate::domain::quote::{CostItem, Frequency, Quote};
use crate::numeric::{money_value, positive};
use crate::pricing::addons::compute_enhancement_addons;
use crate::reference::lookup_country;

/// Wrappers vendors put around the interesting object.
const ENVELOPES: [&str; 4] = ["", "data", "quote", "result"];

const ITEM_NAME_KEYS: [&str; 5] = ["name", "label", "title", "description", "type"];
const ITEM_AMOUNT_KEYS: [&str; 5] = ["amount", "monthly_amount", "monthlyAmount", "value", "cost"];
const ITEM_FREQUENCY_KEYS: [&str; 3] = ["frequency", "recurrence", "period"];
const CURRENCY_KEYS: [&str; 3] = ["currency", "currency_code", "currencyCode"];
const COUNTRY_KEYS: [&str; 3] = ["country", "country_name", "countryName"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum PriceSource {
    Breakdown,
    TotalEnhancement,
    AddOns,
    Field(&'static str),
    Reconstructed,
    Transformed,
}

impl PriceSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Breakdown => "monthly_cost_breakdown",
            Self::TotalEnhancement => "base_quote+total_enhancement",
            Self::AddOns => "base_quote+add_ons",
            Self::Field(path) => *path,
            Self::Reconstructed => "reconstructed",
            Self::Transformed => "transform.total_costs",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ExtractedPrice {
    pub amount: Decimal,
    pub source: PriceSource,
}

/// One step of the raw-payload fallback chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Candidate {
    Field(&'static str),
    Reconstruct,
    Transform,
}

pub struct ProviderExtractor {
    pub provider: ProviderId,
    /// Total fields in priority order, dotted paths relative to an envelope.
    pub total_fields: &'static [&'static str],
    pub reconstruct: fn(&Value) -> Option<Decimal>,
    pub salary_fields: &'static [&'static str],
    pub item_arrays: &'static [&'static str],
}

impl ProviderExtractor {
    pub fn chain(&self) -> Vec<Candidate> {
        self.total_fields
            .iter()
            .map(|path| Candidate::Field(*path))
            .chain([Candidate::Reconstruct, Candidate::Transform])
            .collect()
    }

    fn evaluate(&self, candidate: Candidate, raw: &Value) -> Option<ExtractedPrice> {
        let (amount, source) = match candidate {
            Candidate::Field(path) => (lookup_money(raw, path), PriceSource::Field(path)),
            Candidate::Reconstruct => ((self.reconstruct)(raw), PriceSource::Reconstructed),
            Candidate::Transform => (
                transform_with(self, raw).map(|quote| quote.total_costs),
                PriceSource::Transformed,
            ),
        };
        positive(amount).map(|amount| ExtractedPrice { amount, source })
    }

    /// Price from a raw payload only.
    pub fn extract_raw(&self, raw: &Value) -> Option<ExtractedPrice> {
        self.chain().into_iter().find_map(|candidate| self.evaluate(candidate, raw))
    }
}

static DEEL: ProviderExtractor = ProviderExtractor {
    provider: ProviderId::Deel,
    total_fields: &["total_costs", "totalCosts", "costs.total", "total", "monthly_total"],
    reconstruct: reconstruct_deel,
    salary_fields: &["salary", "gross_salary"],
    item_arrays: &["costs", "employer_costs_items"],
};

static REMOTE: ProviderExtractor = ProviderExtractor {
    provider: ProviderId::Remote,
    total_fields: &[
        "employments.employer_currency_costs.monthly_total",
        "employer_currency_costs.monthly_total",
        "monthly_total",
        "total_costs",
        "regional_currency_costs.monthly_total",
    ],
    reconstruct: reconstruct_remote,
    salary_fields: &[
        "employments.employer_currency_costs.monthly_gross_salary",
        "employer_currency_costs.monthly_gross_salary",
        "monthly_gross_salary",
    ],
    item_arrays: &[
        "employments.employer_currency_costs.monthly_contributions_breakdown",
        "employer_currency_costs.monthly_contributions_breakdown",
        "monthly_contributions_breakdown",
    ],
};

static RIPPLING: ProviderExtractor = ProviderExtractor {
    provider: ProviderId::Rippling,
    total_fields: &["monthlyTotal", "total_monthly_cost", "totalCost.monthly", "total_costs"],
    reconstruct: reconstruct_rippling,
    salary_fields: &["monthlySalary", "salary"],
    item_arrays: &["costBreakdown", "employerCosts", "fees"],
};

static RIVERMATE: ProviderExtractor = ProviderExtractor {
    provider: ProviderId::Rivermate,
    total_fields: &["total_costs", "totalCosts", "total", "monthly_total"],
    reconstruct: reconstruct_rivermate,
    salary_fields: &["salary", "grossSalary"],
    item_arrays: &["taxItems", "tax_items", "costs"],
};

static SKUAD: ProviderExtractor = ProviderExtractor {
    provider: ProviderId::Skuad,
    total_fields: &["totalCost", "total_cost", "monthlyTotal", "totalMonthlyCost"],
    reconstruct: reconstruct_skuad,
    salary_fields: &["grossSalary", "salary"],
    item_arrays: &["employerContributions", "breakdown"],
};

static VELOCITY_GLOBAL: ProviderExtractor = ProviderExtractor {
    provider: ProviderId::VelocityGlobal,
    total_fields: &["totalMonthlyCost", "total_monthly_cost", "monthly.total", "total"],
    reconstruct: reconstruct_velocity_global,
    salary_fields: &["monthlySalary", "salary", "monthly.salary"],
    item_arrays: &["monthly.items", "costItems", "items"],
};

static OYSTER: ProviderExtractor = ProviderExtractor {
    provider: ProviderId::Oyster,
    total_fields: &["total_monthly_cost", "totalEmployerCost", "monthly_total", "total_cost"],
    reconstruct: reconstruct_oyster,
    salary_fields: &["gross_salary", "salary"],
    item_arrays: &["employer_contributions", "contributions"],
};

static PLAYROLL: ProviderExtractor = ProviderExtractor {
    provider: ProviderId::Playroll,
    total_fields: &["total_cost", "totalCost", "total", "monthly_total_cost"],
    reconstruct: reconstruct_playroll,
    salary_fields: &["salary", "gross_salary"],
    item_arrays: &["line_items", "costs"],
};

static OMNIPRESENT: ProviderExtractor = ProviderExtractor {
    provider: ProviderId::Omnipresent,
    total_fields: &["monthly_total_cost", "totalCosts", "total", "total_costs"],
    reconstruct: reconstruct_omnipresent,
    salary_fields: &["salary", "gross_monthly_salary"],
    item_arrays: &["employer_costs", "costs"],
};

pub fn extractor_for(provider: ProviderId) -> &'static ProviderExtractor {
    match provider {
        ProviderId::Deel => &DEEL,
        ProviderId::Remote => &REMOTE,
        ProviderId::Rippling => &RIPPLING,
        ProviderId::Rivermate => &RIVERMATE,
        ProviderId::Skuad => &SKUAD,
        ProviderId::VelocityGlobal => &VELOCITY_GLOBAL,
        ProviderId::Oyster => &OYSTER,
        ProviderId::Playroll => &PLAYROLL,
        ProviderId::Omnipresent => &OMNIPRESENT,
    }
}

/// Price implied by an enhancement record: the explicit breakdown, else the
/// base total plus `total_enhancement`, else the base total plus add-ons.
/// `None` when the figures are too large to sum.
pub fn enhanced_price(
    provider: ProviderId,
    enhancement: &EnhancedQuote,
    contract_months: i64,
) -> Option<ExtractedPrice> {
    if let Some(breakdown) = enhancement.monthly_cost_breakdown {
        return breakdown
            .total()
            .map(|amount| ExtractedPrice { amount, source: PriceSource::Breakdown });
    }

    let base = enhancement.base_quote.monthly_total;
    if let Some(total_enhancement) = enhancement.total_enhancement {
        return base
            .checked_add(total_enhancement)
            .map(|amount| ExtractedPrice { amount, source: PriceSource::TotalEnhancement });
    }

    compute_enhancement_addons(provider.as_str(), enhancement, contract_months)
        .and_then(|add_ons| base.checked_add(add_ons))
        .map(|amount| ExtractedPrice { amount, source: PriceSource::AddOns })
}

pub fn extract_with_source(
    provider: ProviderId,
    raw: &Value,
    enhancement: Option<&EnhancedQuote>,
    contract_months: i64,
) -> Option<ExtractedPrice> {
    let extracted = match enhancement {
        Some(enhancement) => enhanced_price(provider, enhancement, contract_months),
        None => extractor_for(provider).extract_raw(raw),
    };

    match &extracted {
        Some(price) => debug!(
            event_name = "pricing.extract.resolved",
            provider = %provider,
            source = price.source.label(),
            amount = %price.amount,
            "provider price extracted"
        ),
        None => debug!(
            event_name = "pricing.extract.unextractable",
            provider = %provider,
            "no positive price candidate found"
        ),
    }
    extracted
}

/// Comparable monthly price, or `None` when the provider cannot be compared.
pub fn extract_provider_price(
    provider: ProviderId,
    raw: &Value,
    enhancement: Option<&EnhancedQuote>,
    contract_months: i64,
) -> Option<Decimal> {
    extract_with_source(provider, raw, enhancement, contract_months).map(|price| price.amount)
}

pub fn extract_by_name(
    provider: &str,
    raw: &Value,
    enhancement: Option<&EnhancedQuote>,
    contract_months: i64,
) -> Option<Decimal> {
    let provider = provider.parse::<ProviderId>().ok()?;
    extract_provider_price(provider, raw, enhancement, contract_months)
}

/// Builds a canonical quote from a provider payload's salary and cost arrays.
pub fn transform_to_quote(provider: ProviderId, raw: &Value) -> Option<Quote> {
    transform_with(extractor_for(provider), raw)
}

fn transform_with(extractor: &ProviderExtractor, raw: &Value) -> Option<Quote> {
    let salary = first_money(raw, extractor.salary_fields)
        .filter(|amount| *amount >= Decimal::ZERO)
        .unwrap_or(Decimal::ZERO);
    let costs: Vec<CostItem> = extractor
        .item_arrays
        .iter()
        .filter_map(|path| lookup(raw, path))
        .find_map(|value| value.as_array().filter(|items| !items.is_empty()))
        .map(|items| items.iter().filter_map(cost_item).collect())
        .unwrap_or_default();

    if salary.is_zero() && costs.is_empty() {
        return None;
    }

    let currency = first_text(raw, &CURRENCY_KEYS).unwrap_or_default().to_ascii_uppercase();
    let country = first_text(raw, &COUNTRY_KEYS).unwrap_or_default();
    let country_code = lookup_country(&country).map(|entry| entry.iso2).unwrap_or_default();

    Quote::from_items(
        Some(extractor.provider.as_str().to_string()),
        country,
        country_code,
        currency,
        salary,
        costs,
    )
}

fn cost_item(value: &Value) -> Option<CostItem> {
    let object = value.as_object()?;
    let amount = ITEM_AMOUNT_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(money_value))
        .filter(|amount| *amount > Decimal::ZERO)?;
    let name = ITEM_NAME_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("Unnamed cost")
        .to_string();
    let frequency = ITEM_FREQUENCY_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(Frequency::from_label)
        .unwrap_or_default();

    Some(CostItem { frequency, ..CostItem::monthly(name, amount) })
}

fn reconstruct_deel(raw: &Value) -> Option<Decimal> {
    component_sum(raw, &["salary", "gross_salary"], &["employer_costs", "fee"], &[])
}

fn reconstruct_remote(raw: &Value) -> Option<Decimal> {
    component_sum(
        raw,
        &[
            "employments.employer_currency_costs.monthly_gross_salary",
            "employer_currency_costs.monthly_gross_salary",
            "monthly_gross_salary",
        ],
        &[
            "employments.employer_currency_costs.monthly_contributions_total",
            "employer_currency_costs.monthly_contributions_total",
            "monthly_contributions_total",
            "employments.employer_currency_costs.monthly_benefits_total",
            "employer_currency_costs.monthly_benefits_total",
            "monthly_benefits_total",
        ],
        &[],
    )
}

fn reconstruct_rippling(raw: &Value) -> Option<Decimal> {
    annualized(raw, &["annualTotal", "annual_total_cost", "totalCost.annual"])
}

fn reconstruct_rivermate(raw: &Value) -> Option<Decimal> {
    component_sum(raw, &["salary", "grossSalary"], &["accrualsProvision"], &["taxItems"])
}

fn reconstruct_skuad(raw: &Value) -> Option<Decimal> {
    component_sum(
        raw,
        &["grossSalary", "salary"],
        &["employerContribution", "platformFee"],
        &["employerContributions"],
    )
}

fn reconstruct_velocity_global(raw: &Value) -> Option<Decimal> {
    annualized(raw, &["annualTotalCost", "annual_total", "annual.total"]).or_else(|| {
        component_sum(raw, &["monthlySalary", "salary"], &["monthlyEmployerCosts", "fee"], &[])
    })
}

fn reconstruct_oyster(raw: &Value) -> Option<Decimal> {
    component_sum(raw, &["gross_salary", "salary"], &["fee"], &["employer_contributions"])
}

fn reconstruct_playroll(raw: &Value) -> Option<Decimal> {
    component_sum(raw, &["salary", "gross_salary"], &["employer_cost", "management_fee"], &[])
}

fn reconstruct_omnipresent(raw: &Value) -> Option<Decimal> {
    component_sum(
        raw,
        &["salary", "gross_monthly_salary"],
        &["employer_contributions", "service_fee"],
        &[],
    )
}

/// Salary plus every positive scalar part and item-array amount. Requires a
/// positive salary and at least one other component; a sum that does not fit
/// a `Decimal` is no price.
fn component_sum(
    raw: &Value,
    salary_paths: &[&str],
    part_paths: &[&str],
    array_paths: &[&str],
) -> Option<Decimal> {
    let salary = positive(first_money(raw, salary_paths))?;

    let mut components = 0usize;
    let mut total = salary;
    for path in part_paths {
        if let Some(amount) = positive(lookup_money(raw, path)) {
            total = total.checked_add(amount)?;
            components += 1;
        }
    }
    for path in array_paths {
        if let Some(items) = lookup(raw, path).and_then(Value::as_array) {
            for amount in items.iter().filter_map(cost_item).map(|item| item.amount) {
                total = total.checked_add(amount)?;
                components += 1;
            }
        }
    }

    (components > 0).then_some(total)
}

fn annualized(raw: &Value, paths: &[&str]) -> Option<Decimal> {
    positive(first_money(raw, paths)).map(|annual| annual / Decimal::from(12))
}

fn first_money(raw: &Value, paths: &[&str]) -> Option<Decimal> {
    paths.iter().find_map(|path| positive(lookup_money(raw, path)))
}

fn first_text(raw: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| lookup(raw, path))
        .find_map(|value| value.as_str().map(str::trim).filter(|text| !text.is_empty()))
        .map(str::to_string)
}

fn lookup_money(raw: &Value, path: &str) -> Option<Decimal> {
    lookup(raw, path).and_then(money_value)
}

/// Resolves a dotted path at the root and inside each known envelope.
/// Numeric segments index arrays; other segments step into the first element
/// of an array.
fn lookup<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    ENVELOPES.iter().find_map(|envelope| {
        let root = if envelope.is_empty() { Some(raw) } else { step(raw, envelope) }?;
        path.split('.').try_fold(root, |value, segment| step(value, segment)).filter(|value| !value.is_null())
    })
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => items.get(index),
            Err(_) => items.first().and_then(|first| step(first, segment)),
        },
        _ => None,
    }
}
