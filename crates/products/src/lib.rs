//! Retail product search.
//!
//! One capability interface with a single strategy behind it: a direct call
//! to the retailer's public search API. A browser-automation strategy could
//! implement the same trait, but the direct request has no external browser
//! dependency.

pub mod direct;

use {async_trait::async_trait, serde::Serialize};

use tgrelay_common::Result;

pub use direct::DirectSearch;

/// Maximum number of products returned per query.
pub const MAX_RESULTS: usize = 10;

/// One product hit.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub name: Option<String>,
    pub link: String,
}

/// Product lookup strategy.
#[async_trait]
pub trait ProductSearch: Send + Sync {
    /// Return up to [`MAX_RESULTS`] products matching `query`.
    async fn search(&self, query: &str) -> Result<Vec<Product>>;
}
