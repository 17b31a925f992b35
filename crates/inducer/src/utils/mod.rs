//! Utility modules for the inducer.

pub mod cache;

pub use cache::{CacheStats, ExpansionCache};
