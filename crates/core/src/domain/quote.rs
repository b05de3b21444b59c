use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Months a one-time charge is spread over when folded into a quote's monthly
/// totals.
pub const ANNUAL_MONTHS: u32 = 12;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Monthly,
    #[serde(alias = "one-time", alias = "onetime", alias = "oneTime")]
    OneTime,
}

impl Frequency {
    /// Monthly-equivalent of `amount`; one-time charges are spread evenly over
    /// `months`, clamped to at least one month.
    pub fn monthly_equivalent(&self, amount: Decimal, months: i64) -> Decimal {
        match self {
            Self::Monthly => amount,
            Self::OneTime => amount / Decimal::from(months.max(1)),
        }
    }

    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "one_time" | "onetime" | "once" | "upfront" | "one_off" => Self::OneTime,
            _ => Self::Monthly,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostItem {
    pub name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl CostItem {
    pub fn monthly(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount,
            frequency: Frequency::Monthly,
            country: None,
            country_code: None,
        }
    }

    pub fn one_time(name: impl Into<String>, amount: Decimal) -> Self {
        Self { frequency: Frequency::OneTime, ..Self::monthly(name, amount) }
    }

    pub fn monthly_equivalent(&self) -> Decimal {
        self.frequency.monthly_equivalent(self.amount, i64::from(ANNUAL_MONTHS))
    }
}

/// One provider's pricing for one employee, country and currency.
///
/// `total_costs` is the salary plus the monthly-equivalent of every entry in
/// `costs`; functions that append items keep that relation intact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub country_code: String,
    pub currency: String,
    #[serde(default)]
    pub salary: Decimal,
    #[serde(default)]
    pub costs: Vec<CostItem>,
    pub total_costs: Decimal,
    #[serde(default)]
    pub employer_costs: Decimal,
}

impl Quote {
    /// Builds a quote whose totals are derived from `salary` and `costs`.
    /// Returns `None` when the totals do not fit a `Decimal`.
    pub fn from_items(
        provider: Option<String>,
        country: impl Into<String>,
        country_code: impl Into<String>,
        currency: impl Into<String>,
        salary: Decimal,
        costs: Vec<CostItem>,
    ) -> Option<Self> {
        let employer_costs = monthly_sum(&costs)?;
        Some(Self {
            provider,
            country: country.into(),
            country_code: country_code.into(),
            currency: currency.into(),
            salary,
            total_costs: salary.checked_add(employer_costs)?,
            costs,
            employer_costs,
        })
    }

    pub fn has_cost_named(&self, name: &str) -> bool {
        self.costs.iter().any(|item| item.name == name)
    }

    pub fn recomputed_total(&self) -> Option<Decimal> {
        self.salary.checked_add(monthly_sum(&self.costs)?)
    }
}

fn monthly_sum(costs: &[CostItem]) -> Option<Decimal> {
    costs
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.monthly_equivalent()))
}
