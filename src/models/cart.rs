use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Schema version written into every persisted snapshot.
pub const CART_SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Selection is empty")]
    Empty,

    #[error("Invalid weight '{0}': expected a positive number of grams such as 2.5g")]
    InvalidWeight(String),
}

/// A weight in tenths of a gram, so that it can key a cart line exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Weight(u32);

impl Weight {
    /// Rounds to the nearest 0.1g. Zero, negative and non-finite inputs are rejected.
    pub fn from_grams(grams: f64) -> Option<Self> {
        if !grams.is_finite() {
            return None;
        }
        let tenths = (grams * 10.0).round();
        if tenths < 1.0 || tenths > u32::MAX as f64 {
            return None;
        }
        Some(Self(tenths as u32))
    }

    pub fn grams(&self) -> f64 {
        self.0 as f64 / 10.0
    }

    /// Whole grams, when the weight has no fractional part.
    pub fn whole_grams(&self) -> Option<u32> {
        if self.0 % 10 == 0 {
            Some(self.0 / 10)
        } else {
            None
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.whole_grams() {
            Some(grams) => write!(f, "{}g", grams),
            None => write!(f, "{}.{}g", self.0 / 10, self.0 % 10),
        }
    }
}

/// The quantity bucket chosen for a line: a weight, or one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Selection {
    Grams(Weight),
    Piece,
}

impl Selection {
    pub fn grams(grams: f64) -> Option<Self> {
        Weight::from_grams(grams).map(Selection::Grams)
    }

    pub fn weight(&self) -> Option<Weight> {
        match self {
            Selection::Grams(weight) => Some(*weight),
            Selection::Piece => None,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Grams(weight) => write!(f, "{}", weight),
            Selection::Piece => write!(f, "1pc"),
        }
    }
}

impl FromStr for Selection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        if trimmed.is_empty() {
            return Err(SelectionError::Empty);
        }
        if matches!(trimmed.as_str(), "1pc" | "pc" | "piece") {
            return Ok(Selection::Piece);
        }

        let number = trimmed
            .strip_suffix('g')
            .unwrap_or(trimmed.as_str())
            .trim();
        number
            .parse::<f64>()
            .ok()
            .and_then(Selection::grams)
            .ok_or_else(|| SelectionError::InvalidWeight(s.trim().to_string()))
    }
}

impl TryFrom<String> for Selection {
    type Error = SelectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Selection> for String {
    fn from(selection: Selection) -> Self {
        selection.to_string()
    }
}

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: String,
    pub selection: Selection,
}

impl LineKey {
    pub fn new(product_id: impl Into<String>, selection: Selection) -> Self {
        Self {
            product_id: product_id.into(),
            selection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub selection: Selection,
    /// Price per unit captured when the line was first added.
    pub unit_price: u64,
    pub quantity: u32,
}

impl LineItem {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id.clone(), self.selection)
    }

    fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.selection == key.selection
    }

    pub fn subtotal(&self) -> u64 {
        self.unit_price.saturating_mul(self.quantity as u64)
    }
}

// request dto
#[derive(Debug, Clone)]
pub struct AddItemRequest {
    pub product_id: String,
    pub name: String,
    pub selection: Selection,
    pub unit_price: u64,
    pub quantity: u32,
}

impl AddItemRequest {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        selection: Selection,
        unit_price: u64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            selection,
            unit_price,
            quantity: 1,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
}

/// Persisted form of a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub items: Vec<LineItem>,
}

/// Insertion-ordered cart lines, unique by (product, selection).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a snapshot, merging duplicate keys and dropping empty lines.
    pub fn from_snapshot(snapshot: CartSnapshot) -> Self {
        let mut cart = Self::new();
        for item in snapshot.items {
            cart.add_item(AddItemRequest {
                product_id: item.product_id,
                name: item.name,
                selection: item.selection,
                unit_price: item.unit_price,
                quantity: item.quantity,
            });
        }
        cart
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            version: CART_SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            items: self.items.clone(),
        }
    }

    /// Add `request.quantity` units, merging into an existing line with the same key.
    ///
    /// A merged line keeps the unit price it was first added with. Zero quantity is a no-op.
    pub fn add_item(&mut self, request: AddItemRequest) {
        if request.quantity == 0 {
            return;
        }

        let key = LineKey::new(request.product_id, request.selection);
        match self.items.iter_mut().find(|item| item.matches(&key)) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(request.quantity);
            }
            None => self.items.push(LineItem {
                product_id: key.product_id,
                name: request.name,
                selection: key.selection,
                unit_price: request.unit_price,
                quantity: request.quantity,
            }),
        }
    }

    /// Remove the line entirely. Returns whether a line was removed.
    pub fn remove_item(&mut self, key: &LineKey) -> bool {
        let before = self.items.len();
        self.items.retain(|item| !item.matches(key));
        self.items.len() != before
    }

    /// Shift a line's count by `delta`, never below 1. Returns the new count.
    pub fn update_quantity(&mut self, key: &LineKey, delta: i64) -> Option<u32> {
        let item = self.items.iter_mut().find(|item| item.matches(key))?;
        let updated = (item.quantity as i64).saturating_add(delta).clamp(1, u32::MAX as i64);
        item.quantity = updated as u32;
        Some(item.quantity)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn get(&self, key: &LineKey) -> Option<&LineItem> {
        self.items.iter().find(|item| item.matches(key))
    }

    pub fn total(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |sum, item| sum.saturating_add(item.subtotal()))
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of counts across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| item.quantity as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn grams(value: f64) -> Selection {
        Selection::grams(value).unwrap()
    }

    fn add(cart: &mut Cart, id: &str, selection: Selection, price: u64) {
        cart.add_item(AddItemRequest::new(id, format!("Product {}", id), selection, price));
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!("5g".parse::<Selection>().unwrap(), grams(5.0));
        assert_eq!("2.5".parse::<Selection>().unwrap(), grams(2.5));
        assert_eq!(" 10G ".parse::<Selection>().unwrap(), grams(10.0));
        assert_eq!("1pc".parse::<Selection>().unwrap(), Selection::Piece);
        assert_eq!("".parse::<Selection>(), Err(SelectionError::Empty));
        assert!("0g".parse::<Selection>().is_err());
        assert!("-3g".parse::<Selection>().is_err());
        assert!("abc".parse::<Selection>().is_err());
    }

    #[test]
    fn test_selection_display() {
        assert_eq!(grams(5.0).to_string(), "5g");
        assert_eq!(grams(0.5).to_string(), "0.5g");
        assert_eq!(grams(12.5).to_string(), "12.5g");
        assert_eq!(Selection::Piece.to_string(), "1pc");
    }

    #[test]
    fn test_weight_rounds_to_tenths() {
        assert_eq!(grams(2.54), grams(2.5));
        assert_eq!(Weight::from_grams(0.04), None);
        assert_eq!(Weight::from_grams(f64::NAN), None);
        assert_eq!(grams(20.0).weight().unwrap().whole_grams(), Some(20));
        assert_eq!(grams(2.5).weight().unwrap().whole_grams(), None);
    }

    #[test]
    fn test_add_same_key_twice_merges() {
        let mut cart = Cart::new();
        add(&mut cart, "A", grams(5.0), 700);
        add(&mut cart, "A", grams(5.0), 700);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.total(), 1400);
    }

    #[test]
    fn test_merged_line_keeps_first_price() {
        let mut cart = Cart::new();
        add(&mut cart, "A", grams(5.0), 700);
        add(&mut cart, "A", grams(5.0), 900);

        assert_eq!(cart.items()[0].unit_price, 700);
        assert_eq!(cart.total(), 1400);
    }

    #[test]
    fn test_different_selection_is_new_line() {
        let mut cart = Cart::new();
        add(&mut cart, "A", grams(5.0), 700);
        add(&mut cart, "A", grams(1.0), 150);
        add(&mut cart, "B", grams(5.0), 700);

        assert_eq!(cart.len(), 3);
        let ids: Vec<_> = cart.items().iter().map(|i| i.selection.to_string()).collect();
        assert_eq!(ids, vec!["5g", "1g", "5g"]);
    }

    #[test]
    fn test_add_with_zero_quantity_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(AddItemRequest::new("A", "A", grams(1.0), 150).with_quantity(0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let mut cart = Cart::new();
        add(&mut cart, "A", grams(5.0), 700);
        let before = cart.clone();

        assert!(!cart.remove_item(&LineKey::new("Z", grams(5.0))));
        assert!(!cart.remove_item(&LineKey::new("A", grams(1.0))));
        assert_eq!(cart, before);
        assert_eq!(cart.total(), 700);
    }

    #[test]
    fn test_remove_drops_whole_line() {
        let mut cart = Cart::new();
        cart.add_item(AddItemRequest::new("A", "A", grams(5.0), 700).with_quantity(4));
        assert!(cart.remove_item(&LineKey::new("A", grams(5.0))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let mut cart = Cart::new();
        cart.add_item(AddItemRequest::new("A", "A", grams(5.0), 700).with_quantity(3));
        let key = LineKey::new("A", grams(5.0));

        assert_eq!(cart.update_quantity(&key, -100), Some(1));
        assert_eq!(cart.get(&key).unwrap().quantity, 1);
        assert_eq!(cart.update_quantity(&key, 4), Some(5));
        assert_eq!(cart.update_quantity(&key, i64::MIN), Some(1));
    }

    #[test]
    fn test_update_quantity_missing_key_is_noop() {
        let mut cart = Cart::new();
        add(&mut cart, "A", grams(5.0), 700);
        assert_eq!(cart.update_quantity(&LineKey::new("B", grams(5.0)), 2), None);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_keys_stay_unique_and_counts_positive() {
        let mut cart = Cart::new();
        let selections = [grams(1.0), grams(5.0), Selection::Piece];
        for round in 0..30i64 {
            let id = format!("P{}", round % 4);
            let selection = selections[(round % 3) as usize];
            add(&mut cart, &id, selection, 100 + round as u64);
            cart.update_quantity(&LineKey::new(id, selection), -(round % 5));
            if round % 7 == 0 {
                cart.remove_item(&LineKey::new("P1", grams(5.0)));
            }
        }

        let keys: HashSet<_> = cart.items().iter().map(LineItem::key).collect();
        assert_eq!(keys.len(), cart.len());
        assert!(cart.items().iter().all(|item| item.quantity >= 1));
        let expected: u64 = cart.items().iter().map(|i| i.unit_price * i.quantity as u64).sum();
        assert_eq!(cart.total(), expected);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut cart = Cart::new();
        cart.add_item(AddItemRequest::new("A", "Lemon Haze", grams(2.5), 688).with_quantity(2));
        add(&mut cart, "B", Selection::Piece, 450);

        let json = serde_json::to_string(&cart.snapshot()).unwrap();
        assert!(json.contains("\"2.5g\""));
        assert!(json.contains("\"1pc\""));

        let restored: CartSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.version, CART_SNAPSHOT_VERSION);
        let restored = Cart::from_snapshot(restored);
        assert_eq!(restored, cart);
        assert_eq!(restored.total(), 688 * 2 + 450);
    }

    #[test]
    fn test_from_snapshot_restores_invariants() {
        let line = |quantity| LineItem {
            product_id: "A".to_string(),
            name: "A".to_string(),
            selection: grams(1.0),
            unit_price: 150,
            quantity,
        };
        let snapshot = CartSnapshot {
            version: CART_SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            items: vec![line(2), line(0), line(3)],
        };

        let cart = Cart::from_snapshot(snapshot);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
    }
}
