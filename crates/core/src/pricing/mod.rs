//! Provider price normalization.
//!
//! `extractors` turns a raw vendor payload (or an enhancement record) into one
//! comparable monthly figure, `addons` holds the shared enhancement math and
//! `compare` ranks providers by the extracted figures.

pub mod addons;
pub mod compare;
pub mod extractors;

pub use addons::{addon_breakdown, compute_enhancement_addons, AddOnBreakdown};
pub use compare::{
    compare_providers, ExcludedProvider, ExclusionReason, ProviderComparison, ProviderQuoteInput,
    RankedProvider,
};
pub use extractors::{
    enhanced_price, extract_by_name, extract_provider_price, extract_with_source,
    transform_to_quote, ExtractedPrice, PriceSource,
};
