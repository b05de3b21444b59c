use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{
    ReconciliationConfig, DEFAULT_CONTRACT_MONTHS, DEFAULT_RISK_ABSOLUTE_FLOOR, DEFAULT_THRESHOLD,
};
use crate::domain::enhancement::EnhancedQuote;

/// Engine identifier of results produced without an advisor.
pub const LOCAL_ENGINE: &str = "local-only";

/// Enhanced quotes already expressed in `target_currency`, plus the rules
/// they are checked against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationInput {
    pub enhancements: Vec<EnhancedQuote>,
    pub target_currency: String,
    pub threshold: Decimal,
    pub risk_mode: bool,
    pub risk_absolute_floor: Decimal,
    pub contract_months: u32,
}

impl ReconciliationInput {
    pub fn new(enhancements: Vec<EnhancedQuote>, target_currency: impl Into<String>) -> Self {
        Self {
            enhancements,
            target_currency: target_currency.into(),
            threshold: DEFAULT_THRESHOLD,
            risk_mode: false,
            risk_absolute_floor: DEFAULT_RISK_ABSOLUTE_FLOOR,
            contract_months: DEFAULT_CONTRACT_MONTHS,
        }
    }

    pub fn with_settings(mut self, settings: &ReconciliationConfig) -> Self {
        self.threshold = settings.threshold;
        self.risk_mode = settings.risk_mode;
        self.risk_absolute_floor = settings.risk_absolute_floor;
        self.contract_months = settings.contract_months;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// Declared monthly total against the recomputed one.
    Total,
    /// Breakdown base cost against the provider's base quote.
    Base,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyTrigger {
    RelativeThreshold,
    AbsoluteFloor,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub provider: String,
    pub kind: DiscrepancyKind,
    pub declared: Decimal,
    pub recomputed: Decimal,
    /// `recomputed - declared`.
    pub difference: Decimal,
    pub ratio: Decimal,
    pub triggers: Vec<DiscrepancyTrigger>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub action: String,
    pub rationale: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationMetadata {
    pub threshold: Decimal,
    pub risk_mode: bool,
    pub currency: String,
    pub generated_at: DateTime<Utc>,
    pub engine: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub discrepancies: Vec<Discrepancy>,
    pub recommendations: Vec<Recommendation>,
    pub metadata: ReconciliationMetadata,
}

impl ReconciliationResult {
    pub fn is_local_only(&self) -> bool {
        self.metadata.engine == LOCAL_ENGINE
    }
}

/// Boundary payload for a reconciliation run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRequest {
    pub enhancements: Vec<EnhancedQuote>,
    #[serde(default)]
    pub target_currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_mode: Option<bool>,
    #[serde(default, rename = "useLLM")]
    pub use_llm: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_months: Option<u32>,
}
