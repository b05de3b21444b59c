//! LLM-backed collaborators for the reconciliation engine.
//!
//! This crate adapts a pluggable [`llm::LlmClient`] to the core's advisor and
//! categorizer seams:
//! - `advisor` - turns flagged discrepancies into review recommendations
//! - `categorizer` - assigns categories to provider cost items
//! - `guardrails` - screens every model proposal before it reaches a caller
//! - `llm` - the client trait plus an HTTP client for OpenAI, Anthropic and
//!   Ollama
//!
//! # Safety Principle
//!
//! The LLM is strictly an annotator. It NEVER decides prices or totals. Every
//! amount in a response comes from the deterministic core; proposals that try
//! to set one are dropped by the guardrails.

pub mod advisor;
pub mod categorizer;
pub mod guardrails;
pub mod llm;

pub use advisor::LlmReconciliationAdvisor;
pub use categorizer::LlmCostCategorizer;
pub use guardrails::{AdvisorProposal, GuardrailDecision, GuardrailPolicy};
pub use llm::{HttpLlmClient, LlmClient};
