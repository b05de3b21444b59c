pub mod config;
pub mod currency;
pub mod domain;
pub mod errors;
pub mod local_office;
pub mod numeric;
pub mod pricing;
pub mod reconciliation;
pub mod reference;

pub use currency::{
    convert, convert_all, ConversionError, ConversionRequest, CurrencyConverter,
    FixedRateConverter,
};
pub use domain::enhancement::{BaseQuote, EnhancedQuote, EnhancementItem, MonthlyCostBreakdown};
pub use domain::provider::{ProviderId, UnknownProvider};
pub use domain::quote::{CostItem, Frequency, Quote};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use local_office::{
    enrich_quote_with_local_office, LocalOfficeEntry, LocalOfficeField, LocalOfficeInfo,
    LocalOfficeOptions, ValueOrigin,
};
pub use pricing::{
    compare_providers, compute_enhancement_addons, extract_provider_price, extract_with_source,
    ProviderComparison, ProviderQuoteInput,
};
pub use reconciliation::{
    build_input_from_enhancements, compute_local, AdvisorError, CategorizationRequest,
    CategorizedCosts, CostCategorizer, ReconciliationAdvisor, ReconciliationError,
    ReconciliationInput, ReconciliationRequest, ReconciliationResult, ReconciliationService,
    Recommendation, LOCAL_ENGINE,
};
