//! Country-specific local-office costs merged into provider quotes.
//!
//! Some countries require benefits or one-off checks that providers do not
//! quote (meal vouchers, transport allowances, pre-employment medicals). The
//! defaults below carry them per country; a caller may pass its own table,
//! which then replaces the defaults and is taken as already being in the
//! quote's currency.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::currency::{convert_all, ConversionError, ConversionRequest, CurrencyConverter};
use crate::domain::quote::{CostItem, Frequency, Quote};
use crate::numeric::{money_value, positive};
use crate::reference::{currency_for_country, lookup_country};

const SENTINELS: [&str; 4] = ["n/a", "no", "-", ""];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocalOfficeField {
    MealVoucher,
    Transportation,
    InternetAllowance,
    MobileAllowance,
    HealthInsurance,
    PreEmploymentMedicalTest,
    BackgroundCheck,
    DrugTest,
    /// Informational only; never billed as an item.
    Vat,
}

impl LocalOfficeField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MealVoucher => "Meal Voucher (Local Office)",
            Self::Transportation => "Transportation (Local Office)",
            Self::InternetAllowance => "Internet Allowance (Local Office)",
            Self::MobileAllowance => "Mobile Allowance (Local Office)",
            Self::HealthInsurance => "Health Insurance (Local Office)",
            Self::PreEmploymentMedicalTest => "Pre-Employment Medical Test (Local Office)",
            Self::BackgroundCheck => "Background Check (Local Office)",
            Self::DrugTest => "Drug Test (Local Office)",
            Self::Vat => "VAT on Invoice",
        }
    }

    pub fn frequency(&self) -> Frequency {
        match self {
            Self::PreEmploymentMedicalTest | Self::BackgroundCheck | Self::DrugTest => {
                Frequency::OneTime
            }
            _ => Frequency::Monthly,
        }
    }

    pub fn is_vat(&self) -> bool {
        matches!(self, Self::Vat)
    }
}

/// Currency a default-table value is expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
    #[default]
    Local,
    Usd,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalOfficeEntry {
    pub value: Value,
    #[serde(default)]
    pub origin: ValueOrigin,
}

impl LocalOfficeEntry {
    /// Positive amount, or `None` for sentinels and non-numeric values.
    pub fn amount(&self) -> Option<Decimal> {
        if let Value::String(raw) = &self.value {
            if SENTINELS.contains(&raw.trim().to_ascii_lowercase().as_str()) {
                return None;
            }
        }
        positive(money_value(&self.value))
    }
}

pub type LocalOfficeInfo = BTreeMap<LocalOfficeField, LocalOfficeEntry>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalOfficeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_office_info: Option<LocalOfficeInfo>,
}

type DefaultRow = (LocalOfficeField, &'static str, ValueOrigin);

const DEFAULT_ROWS: &[(&str, &[DefaultRow])] = &[
    (
        "BR",
        &[
            (LocalOfficeField::MealVoucher, "R$ 1.100,00", ValueOrigin::Local),
            (LocalOfficeField::Transportation, "300", ValueOrigin::Local),
            (LocalOfficeField::PreEmploymentMedicalTest, "150", ValueOrigin::Local),
            (LocalOfficeField::Vat, "N/A", ValueOrigin::Local),
        ],
    ),
    (
        "MX",
        &[
            (LocalOfficeField::MealVoucher, "3,258", ValueOrigin::Local),
            (LocalOfficeField::HealthInsurance, "95", ValueOrigin::Usd),
            (LocalOfficeField::BackgroundCheck, "60", ValueOrigin::Usd),
            (LocalOfficeField::Vat, "16%", ValueOrigin::Local),
        ],
    ),
    (
        "CO",
        &[
            (LocalOfficeField::Transportation, "162,000", ValueOrigin::Local),
            (LocalOfficeField::InternetAllowance, "No", ValueOrigin::Local),
            (LocalOfficeField::PreEmploymentMedicalTest, "45", ValueOrigin::Usd),
        ],
    ),
    (
        "PH",
        &[
            (LocalOfficeField::HealthInsurance, "85", ValueOrigin::Usd),
            (LocalOfficeField::MobileAllowance, "1,500", ValueOrigin::Local),
            (LocalOfficeField::DrugTest, "-", ValueOrigin::Usd),
        ],
    ),
    (
        "IN",
        &[
            (LocalOfficeField::HealthInsurance, "40", ValueOrigin::Usd),
            (LocalOfficeField::InternetAllowance, "1,000", ValueOrigin::Local),
            (LocalOfficeField::BackgroundCheck, "35", ValueOrigin::Usd),
        ],
    ),
    (
        "PT",
        &[
            (LocalOfficeField::MealVoucher, "209", ValueOrigin::Local),
            (LocalOfficeField::PreEmploymentMedicalTest, "55", ValueOrigin::Local),
        ],
    ),
    (
        "PL",
        &[
            (LocalOfficeField::MealVoucher, "N/A", ValueOrigin::Local),
            (LocalOfficeField::HealthInsurance, "180", ValueOrigin::Local),
        ],
    ),
];

fn default_table() -> &'static HashMap<&'static str, LocalOfficeInfo> {
    static TABLE: OnceLock<HashMap<&'static str, LocalOfficeInfo>> = OnceLock::new();
    TABLE.get_or_init(|| {
        DEFAULT_ROWS
            .iter()
            .map(|(iso2, rows)| {
                let info: LocalOfficeInfo = rows
                    .iter()
                    .map(|(field, value, origin)| {
                        (
                            *field,
                            LocalOfficeEntry {
                                value: Value::String((*value).to_string()),
                                origin: *origin,
                            },
                        )
                    })
                    .collect();
                (*iso2, info)
            })
            .collect()
    })
}

/// Built-in local-office entries for an ISO2 code.
pub fn default_local_office_info(iso2: &str) -> Option<&'static LocalOfficeInfo> {
    default_table().get(iso2.trim().to_ascii_uppercase().as_str())
}

struct PendingItem {
    field: LocalOfficeField,
    request: ConversionRequest,
}

/// Appends the country's local-office items to `quote`.
///
/// Items whose name already appears in the quote are left alone, so running
/// this twice yields the same quote as running it once. Totals grow by the
/// monthly equivalent of the appended items only.
pub async fn enrich_quote_with_local_office<C>(
    quote: Quote,
    options: &LocalOfficeOptions,
    converter: &C,
) -> Result<Quote, ConversionError>
where
    C: CurrencyConverter + ?Sized,
{
    let country = options
        .country_name
        .as_deref()
        .and_then(lookup_country)
        .or_else(|| lookup_country(&quote.country_code))
        .or_else(|| lookup_country(&quote.country));
    let Some(country) = country else {
        debug!(
            event_name = "local_office.country.unresolved",
            country = %quote.country,
            "local office enrichment skipped"
        );
        return Ok(quote);
    };

    let caller_info = options.local_office_info.as_ref().filter(|info| !info.is_empty());
    let caller_supplied = caller_info.is_some();
    let Some(source) = caller_info.or_else(|| default_local_office_info(country.iso2)) else {
        return Ok(quote);
    };

    let target = options.currency.trim();
    let pending: Vec<PendingItem> = source
        .iter()
        .filter(|(field, _)| !field.is_vat() && !quote.has_cost_named(field.label()))
        .filter_map(|(field, entry)| {
            let amount = entry.amount()?;
            let from = if caller_supplied {
                target
            } else {
                match entry.origin {
                    ValueOrigin::Usd => "USD",
                    ValueOrigin::Local => currency_for_country(country.iso2)?,
                }
            };
            Some(PendingItem { field: *field, request: ConversionRequest::new(amount, from, target) })
        })
        .collect();

    if pending.is_empty() {
        return Ok(quote);
    }

    let requests: Vec<ConversionRequest> = pending.iter().map(|item| item.request.clone()).collect();
    let converted = convert_all(converter, &requests).await?;

    let mut enriched = quote;
    let mut added = 0usize;
    for (item, amount) in pending.iter().zip(converted) {
        if amount <= Decimal::ZERO {
            continue;
        }
        let cost = CostItem {
            name: item.field.label().to_string(),
            amount,
            frequency: item.field.frequency(),
            country: Some(country.name.to_string()),
            country_code: Some(country.iso2.to_string()),
        };
        let monthly = cost.monthly_equivalent();
        let totals = enriched
            .total_costs
            .checked_add(monthly)
            .zip(enriched.employer_costs.checked_add(monthly));
        let Some((total_costs, employer_costs)) = totals else {
            warn!(
                event_name = "local_office.item.out_of_range",
                item = item.field.label(),
                amount = %amount,
                "local office item skipped; quote totals would overflow"
            );
            continue;
        };
        enriched.total_costs = total_costs;
        enriched.employer_costs = employer_costs;
        enriched.costs.push(cost);
        added += 1;
    }

    info!(
        event_name = "local_office.enrichment.completed",
        country_code = country.iso2,
        currency = target,
        caller_supplied,
        added_items = added,
        "local office items merged into quote"
    );

    Ok(enriched)
}
