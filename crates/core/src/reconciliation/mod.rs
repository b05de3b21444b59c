//! Declared-versus-recomputed total checks over enhanced quotes.
//!
//! A run moves through input building (currency normalization), the local
//! check, and an optional advisor round whose failure degrades to the local
//! result.

pub mod advisor;
pub mod input;
pub mod local;
pub mod model;
pub mod service;

pub use advisor::{
    AdvisorError, CategorizationRequest, CategorizedCosts, CategorizedItem, CostCategorizer,
    CostCategory, ReconciliationAdvisor,
};
pub use input::{build_input_from_enhancements, ReconciliationError};
pub use local::{compute_local, declared_total, recomputed_total};
pub use model::{
    Discrepancy, DiscrepancyKind, DiscrepancyTrigger, ReconciliationInput, ReconciliationMetadata,
    ReconciliationRequest, ReconciliationResult, Recommendation, LOCAL_ENGINE,
};
pub use service::ReconciliationService;
