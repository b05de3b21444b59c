//! Collaborator seams for model-backed advice.
//!
//! Implementations may classify and recommend but never produce prices: the
//! local result stays the source of truth for every amount.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::quote::{CostItem, Frequency};
use crate::errors::ApplicationError;
use crate::reconciliation::model::{ReconciliationInput, ReconciliationResult, Recommendation};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdvisorError {
    #[error("advisor is not configured")]
    NotConfigured,
    #[error("advisor transport failure: {0}")]
    Transport(String),
    #[error("advisor returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("advisor response rejected by guardrails: {0}")]
    Rejected(String),
}

impl From<AdvisorError> for ApplicationError {
    fn from(value: AdvisorError) -> Self {
        match value {
            AdvisorError::NotConfigured => {
                Self::Unavailable("advisor is not configured".to_string())
            }
            other => Self::Advisor(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ReconciliationAdvisor: Send + Sync {
    /// Identifier recorded as the result engine when this advisor answers.
    fn engine_id(&self) -> &str;

    async fn recommend(
        &self,
        input: &ReconciliationInput,
        local: &ReconciliationResult,
    ) -> Result<Vec<Recommendation>, AdvisorError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    BaseSalary,
    StatutoryContribution,
    Benefit,
    ProviderFee,
    OneTimeFee,
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizationRequest {
    pub provider: String,
    pub country: String,
    pub currency: String,
    pub cost_items: Vec<CostItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedItem {
    pub name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub frequency: Frequency,
    pub category: CostCategory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedCosts {
    pub provider: String,
    pub currency: String,
    pub items: Vec<CategorizedItem>,
    pub engine: String,
}

#[async_trait]
pub trait CostCategorizer: Send + Sync {
    async fn categorize_cost_items(
        &self,
        request: &CategorizationRequest,
    ) -> Result<CategorizedCosts, AdvisorError>;
}

#[cfg(test)]
mod tests {
    use super::AdvisorError;
    use crate::errors::ApplicationError;

    #[test]
    fn advisor_errors_map_to_application_errors() {
        assert!(matches!(
            ApplicationError::from(AdvisorError::NotConfigured),
            ApplicationError::Unavailable(_)
        ));
        assert!(matches!(
            ApplicationError::from(AdvisorError::Transport("timeout".to_string())),
            ApplicationError::Advisor(_)
        ));
    }
}
