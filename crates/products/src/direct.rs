//! Direct-request search strategy against the Wildberries catalog API.

use {
    anyhow::anyhow,
    async_trait::async_trait,
    serde::Deserialize,
    tracing::debug,
};

use tgrelay_common::{Error, Result};

use crate::{MAX_RESULTS, Product, ProductSearch};

const DEFAULT_SEARCH_BASE: &str = "https://search.wb.ru";
const CATALOG_BASE: &str = "https://www.wildberries.ru";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Search via the public catalog JSON endpoint, browser-like headers and all.
pub struct DirectSearch {
    http: reqwest::Client,
    base_url: String,
}

impl DirectSearch {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_SEARCH_BASE)
    }

    /// Point the strategy at a different host (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for DirectSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<SearchData>,
}

#[derive(Default, Deserialize)]
struct SearchData {
    #[serde(default)]
    products: Vec<RawProduct>,
}

#[derive(Deserialize)]
struct RawProduct {
    name: Option<String>,
    id: Option<u64>,
}

#[async_trait]
impl ProductSearch for DirectSearch {
    async fn search(&self, query: &str) -> Result<Vec<Product>> {
        let encoded = urlencoding::encode(query);
        let url = format!(
            "{}/exactmatch/ru/common/v5/search?ab_testing=false&appType=1&curr=rub\
             &dest=-1257786&query={encoded}&resultset=catalog&sort=popular&spp=30\
             &suppressSpellcheck=false",
            self.base_url
        );

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "*/*")
            .header(reqwest::header::ACCEPT_LANGUAGE, "ru-RU,ru;q=0.8")
            .header(reqwest::header::ORIGIN, CATALOG_BASE)
            .header(reqwest::header::REFERER, format!("{CATALOG_BASE}/"))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(Error::unexpected)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(anyhow!("product search returned {status}")));
        }

        let body: SearchResponse = response.json().await.map_err(Error::unexpected)?;
        let products: Vec<Product> = body
            .data
            .unwrap_or_default()
            .products
            .into_iter()
            .take(MAX_RESULTS)
            .filter_map(|raw| {
                let id = raw.id?;
                Some(Product {
                    name: raw.name,
                    link: format!("{CATALOG_BASE}/catalog/{id}/detail.aspx"),
                })
            })
            .collect();

        debug!(query, count = products.len(), "product search completed");
        Ok(products)
    }
}
