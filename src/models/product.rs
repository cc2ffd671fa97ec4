use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::cart::Selection;

/// Category whose products are sold by weight and priced from the grade grids.
pub const WEIGHED_CATEGORY: &str = "buds";

/// Filter sentinel meaning "any grade".
pub const ALL_GRADES: &str = "All Grades";

/// Filter sentinel meaning "any strain type".
pub const ALL_TYPES: &str = "All Types";

pub const STRAIN_TYPES: [&str; 3] = ["Indica", "Sativa", "Hybrid"];

/// Prefix of ids made up for rows that carry none.
pub const FALLBACK_ID_PREFIX: &str = "row-";

pub const PLACEHOLDER_IMAGE: &str = "/product-placeholder.webp";

/// One row of the inventory sheet, as the feed sends it.
///
/// Column names arrive either spreadsheet-style (`Name`, `Price_1g`) or
/// lowercase, and numeric cells may be numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InventoryRow {
    #[serde(alias = "Id", alias = "ID")]
    pub id: Option<Value>,
    #[serde(alias = "Name")]
    pub name: Option<Value>,
    #[serde(alias = "Category")]
    pub category: Option<Value>,
    #[serde(alias = "Subcategory")]
    pub subcategory: Option<Value>,
    #[serde(rename = "type", alias = "Type")]
    pub strain_type: Option<Value>,
    #[serde(alias = "Price")]
    pub price: Option<Value>,
    #[serde(rename = "Price_1g", alias = "price_1g")]
    pub price_1g: Option<Value>,
    #[serde(rename = "Price_5g", alias = "price_5g")]
    pub price_5g: Option<Value>,
    #[serde(rename = "Price_10g", alias = "price_10g")]
    pub price_10g: Option<Value>,
    #[serde(rename = "Price_20g", alias = "price_20g")]
    pub price_20g: Option<Value>,
    #[serde(alias = "Image", alias = "Photo", alias = "photo")]
    pub image: Option<Value>,
    #[serde(alias = "Badge")]
    pub badge: Option<Value>,
    #[serde(alias = "Stock")]
    pub stock: Option<Value>,
    #[serde(alias = "Description")]
    pub description: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    New,
    Hit,
    Sale,
}

impl Badge {
    /// Unknown tags mean no badge.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "NEW" => Some(Badge::New),
            "HIT" => Some(Badge::Hit),
            "SALE" => Some(Badge::Sale),
            _ => None,
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Badge::New => write!(f, "NEW"),
            Badge::Hit => write!(f, "HIT"),
            Badge::Sale => write!(f, "SALE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Product {
    #[validate(length(min = 1, message = "Product id is required"))]
    pub id: String,
    #[validate(length(min = 1, max = 200, message = "Product name must be 1-200 characters"))]
    pub name: String,
    pub category: String,
    /// Grade; selects the price grid and display colour.
    pub subcategory: String,
    pub strain_type: Option<String>,
    /// Base unit price in baht.
    pub price: u64,
    /// Explicit prices keyed by selection label, e.g. `"5g"`.
    pub tier_prices: BTreeMap<String, u64>,
    pub image: String,
    pub badge: Option<Badge>,
    /// `None` means stock is not tracked.
    pub stock: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl Product {
    /// Normalize a feed row. A missing id becomes `row-{index}`.
    pub fn from_row(index: usize, row: InventoryRow) -> Result<Self, ProductError> {
        let id = row
            .id
            .as_ref()
            .and_then(cell_text)
            .unwrap_or_else(|| format!("{}{}", FALLBACK_ID_PREFIX, index));

        let tier_prices: BTreeMap<String, u64> = [
            ("1g", &row.price_1g),
            ("5g", &row.price_5g),
            ("10g", &row.price_10g),
            ("20g", &row.price_20g),
        ]
        .into_iter()
        .filter_map(|(label, cell)| {
            cell.as_ref()
                .and_then(cell_amount)
                .map(|amount| (label.to_string(), amount))
        })
        .collect();

        let price = row
            .price
            .as_ref()
            .and_then(cell_amount)
            .or_else(|| tier_prices.get("1g").copied())
            .unwrap_or(0);

        let product = Self {
            id,
            name: row.name.as_ref().and_then(cell_text).unwrap_or_default(),
            category: row.category.as_ref().and_then(cell_text).unwrap_or_default(),
            subcategory: row.subcategory.as_ref().and_then(cell_text).unwrap_or_default(),
            strain_type: row.strain_type.as_ref().and_then(cell_text),
            price,
            tier_prices,
            image: resolve_image(row.image.as_ref().and_then(cell_text).as_deref()),
            badge: row.badge.as_ref().and_then(cell_text).and_then(|b| Badge::parse(&b)),
            stock: row.stock.as_ref().and_then(cell_number).map(|n| n.floor() as i64),
            description: row.description.as_ref().and_then(cell_text),
        };

        product.validate()?;
        Ok(product)
    }

    /// Absent stock counts as available; a tracked count must be positive.
    pub fn is_available(&self) -> bool {
        self.stock.map_or(true, |stock| stock > 0)
    }

    pub fn is_weighed(&self) -> bool {
        self.category.trim().eq_ignore_ascii_case(WEIGHED_CATEGORY)
    }

    pub fn tier_price(&self, selection: &Selection) -> Option<u64> {
        self.tier_prices.get(&selection.to_string()).copied()
    }
}

/// Empty means placeholder, absolute URLs pass through, bare names live under `/images/`.
pub fn resolve_image(path: Option<&str>) -> String {
    match path.map(str::trim) {
        None | Some("") => PLACEHOLDER_IMAGE.to_string(),
        Some(p) if p.starts_with("http") => p.to_string(),
        Some(p) => format!("/images/{}", p.trim_start_matches('/')),
    }
}

fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn cell_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace([',', '฿'], "").parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn cell_amount(value: &Value) -> Option<u64> {
    cell_number(value)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
}

/// Category / grade / strain filter for the catalog view.
#[derive(Debug, Default, Clone)]
pub struct CatalogFilter {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub strain_type: Option<String>,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn with_strain_type(mut self, strain_type: impl Into<String>) -> Self {
        self.strain_type = Some(strain_type.into());
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        field_matches(self.category.as_deref(), None, Some(&product.category))
            && field_matches(
                self.subcategory.as_deref(),
                Some(ALL_GRADES),
                Some(&product.subcategory),
            )
            && field_matches(
                self.strain_type.as_deref(),
                Some(ALL_TYPES),
                product.strain_type.as_deref(),
            )
    }
}

fn field_matches(wanted: Option<&str>, sentinel: Option<&str>, actual: Option<&str>) -> bool {
    let wanted = match wanted.map(str::trim) {
        None | Some("") => return true,
        Some(w) => w,
    };
    if sentinel.is_some_and(|s| s.eq_ignore_ascii_case(wanted)) {
        return true;
    }
    actual.is_some_and(|a| a.trim().eq_ignore_ascii_case(wanted))
}
