pub mod enhancement;
pub mod provider;
pub mod quote;
