use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::product::{
    CatalogFilter, InventoryRow, Product, ALL_GRADES, ALL_TYPES, STRAIN_TYPES,
};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid inventory url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Inventory feed answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("Inventory feed did not return a JSON array")]
    NotAnArray,
}

/// Where raw inventory rows come from.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<Value>, CatalogError>;
}

/// Spreadsheet-backed inventory endpoint, queried with `?action=getInventory`.
pub struct HttpInventorySource {
    client: reqwest::Client,
    url: Url,
}

impl HttpInventorySource {
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        let mut url = Url::parse(base_url)?;
        url.query_pairs_mut().append_pair("action", "getInventory");

        Ok(Self {
            client: reqwest::Client::new(),
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl InventorySource for HttpInventorySource {
    async fn fetch_rows(&self) -> Result<Vec<Value>, CatalogError> {
        debug!("Fetching inventory from {}", self.url);
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::UnexpectedStatus(status.as_u16()));
        }

        match response.json::<Value>().await? {
            Value::Array(rows) => Ok(rows),
            _ => Err(CatalogError::NotAnArray),
        }
    }
}

/// Turn raw feed rows into products, dropping malformed and sold-out rows.
///
/// Ids are unique in the result; a row repeating an earlier id is skipped.
pub fn ingest_rows(rows: Vec<Value>) -> Vec<Product> {
    let total = rows.len();
    let mut seen_ids = HashSet::new();
    let products: Vec<Product> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let row: InventoryRow = match serde_json::from_value(value) {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping inventory row {}: {}", index, e);
                    return None;
                }
            };
            match Product::from_row(index, row) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!("Skipping inventory row {}: {}", index, e);
                    None
                }
            }
        })
        .filter(|product| {
            let available = product.is_available();
            if !available {
                debug!("Hiding '{}', out of stock", product.name);
            }
            available
        })
        .filter(|product| {
            let first = seen_ids.insert(product.id.clone());
            if !first {
                warn!("Skipping '{}', id {} is already taken", product.name, product.id);
            }
            first
        })
        .collect();

    debug!("Ingested {} of {} inventory rows", products.len(), total);
    products
}

fn push_unique(values: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return;
    }
    if !values.iter().any(|v| v.eq_ignore_ascii_case(candidate)) {
        values.push(candidate.to_string());
    }
}

pub struct CatalogService {
    source: Arc<dyn InventorySource>,
    products: Vec<Product>,
}

impl CatalogService {
    pub fn new(source: Arc<dyn InventorySource>) -> Self {
        Self {
            source,
            products: Vec::new(),
        }
    }

    /// Replace the catalog with a fresh fetch. A failed fetch leaves it empty.
    pub async fn refresh(&mut self) -> usize {
        self.products = match self.source.fetch_rows().await {
            Ok(rows) => ingest_rows(rows),
            Err(e) => {
                warn!("Products not loaded: {}", e);
                Vec::new()
            }
        };

        info!("Catalog holds {} products", self.products.len());
        self.products.len()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn find(&self, product_id: &str) -> Option<&Product> {
        let product_id = product_id.trim();
        self.products.iter().find(|p| p.id == product_id)
    }

    /// Distinct categories in feed order.
    pub fn categories(&self) -> Vec<String> {
        let mut categories = Vec::new();
        for product in &self.products {
            push_unique(&mut categories, &product.category);
        }
        categories
    }

    /// `"All Grades"` followed by the grades seen in `category`, in feed order.
    pub fn subcategories(&self, category: &str) -> Vec<String> {
        let mut grades = vec![ALL_GRADES.to_string()];
        let filter = CatalogFilter::new().with_category(category);
        for product in self.products.iter().filter(|p| filter.matches(p)) {
            push_unique(&mut grades, &product.subcategory);
        }
        grades
    }

    /// Strain filters offered for `category`; only weighed categories have them.
    pub fn strain_types(&self, category: &str) -> Vec<String> {
        let weighed = self
            .products
            .iter()
            .any(|p| p.category.trim().eq_ignore_ascii_case(category.trim()) && p.is_weighed());
        if !weighed {
            return Vec::new();
        }

        std::iter::once(ALL_TYPES)
            .chain(STRAIN_TYPES)
            .map(String::from)
            .collect()
    }

    pub fn filter(&self, filter: &CatalogFilter) -> Vec<&Product> {
        let products: Vec<&Product> = self.products.iter().filter(|p| filter.matches(p)).collect();
        debug!("Filter {:?} matched {} products", filter, products.len());
        products
    }
}
