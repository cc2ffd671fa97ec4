use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Grade used whenever a lookup misses.
pub const DEFAULT_GRADE: &str = "premium";

/// Reference quantities (grams) every grid must price.
pub const ANCHOR_QUANTITIES: [u32; 4] = [1, 5, 10, 20];

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Price grid for '{grade}' is missing the {quantity}g anchor")]
    MissingAnchor { grade: String, quantity: u32 },

    #[error("Price grid for '{grade}' decreases between {from}g and {to}g")]
    NonMonotonic { grade: String, from: u32, to: u32 },

    #[error("Price grid for '{grade}' has unexpected anchor '{anchor}'")]
    UnknownAnchor { grade: String, anchor: String },

    #[error("Pricing table has no grid for the default grade '{0}'")]
    MissingDefault(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A normalized grade name: trimmed, lowercased, inner whitespace collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grade(String);

impl Grade {
    pub fn new(raw: &str) -> Self {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Four-point price table. Prices are whole baht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceGrid {
    pub at_1: u64,
    pub at_5: u64,
    pub at_10: u64,
    pub at_20: u64,
}

impl PriceGrid {
    /// Build a grid, rejecting prices that fall as quantity grows.
    pub fn new(grade: &str, at_1: u64, at_5: u64, at_10: u64, at_20: u64) -> Result<Self, PricingError> {
        let grid = Self { at_1, at_5, at_10, at_20 };
        grid.check_monotonic(grade)?;
        Ok(grid)
    }

    const fn fixed(at_1: u64, at_5: u64, at_10: u64, at_20: u64) -> Self {
        Self { at_1, at_5, at_10, at_20 }
    }

    fn check_monotonic(&self, grade: &str) -> Result<(), PricingError> {
        let points = self.anchors();
        for pair in points.windows(2) {
            let (from_qty, from_price) = pair[0];
            let (to_qty, to_price) = pair[1];
            if to_price < from_price {
                return Err(PricingError::NonMonotonic {
                    grade: grade.to_string(),
                    from: from_qty,
                    to: to_qty,
                });
            }
        }
        Ok(())
    }

    pub fn anchors(&self) -> [(u32, u64); 4] {
        [(1, self.at_1), (5, self.at_5), (10, self.at_10), (20, self.at_20)]
    }

    fn from_anchor_map(grade: &str, map: &BTreeMap<String, u64>) -> Result<Self, PricingError> {
        for key in map.keys() {
            let known = key
                .trim()
                .parse::<u32>()
                .map(|qty| ANCHOR_QUANTITIES.contains(&qty))
                .unwrap_or(false);
            if !known {
                return Err(PricingError::UnknownAnchor {
                    grade: grade.to_string(),
                    anchor: key.clone(),
                });
            }
        }

        let lookup = |quantity: u32| -> Result<u64, PricingError> {
            map.iter()
                .find(|(key, _)| key.trim().parse::<u32>().ok() == Some(quantity))
                .map(|(_, price)| *price)
                .ok_or_else(|| PricingError::MissingAnchor {
                    grade: grade.to_string(),
                    quantity,
                })
        };

        Self::new(grade, lookup(1)?, lookup(5)?, lookup(10)?, lookup(20)?)
    }
}

/// Grade to grid mapping with an explicit fallback grade.
#[derive(Debug, Clone)]
pub struct PricingTable {
    grids: HashMap<Grade, PriceGrid>,
    default_grade: Grade,
}

impl PricingTable {
    /// The house price list.
    pub fn standard() -> Self {
        let grids = [
            ("silver", PriceGrid::fixed(150, 700, 1200, 2000)),
            ("golden", PriceGrid::fixed(250, 1100, 1700, 3000)),
            ("premium", PriceGrid::fixed(300, 1300, 2000, 3500)),
            ("selected premium", PriceGrid::fixed(350, 1500, 2500, 4000)),
        ]
        .into_iter()
        .map(|(name, grid)| (Grade::new(name), grid))
        .collect();

        Self {
            grids,
            default_grade: Grade::new(DEFAULT_GRADE),
        }
    }

    /// Standard table with grids from a JSON file layered on top.
    ///
    /// The file maps grade names to `{"1": .., "5": .., "10": .., "20": ..}`.
    pub fn with_overrides_from_file(path: &Path) -> Result<Self, PricingError> {
        let json_data = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, BTreeMap<String, u64>> = serde_json::from_str(&json_data)?;

        let mut table = Self::standard();
        for (name, anchors) in &raw {
            let grid = PriceGrid::from_anchor_map(name, anchors)?;
            tracing::debug!("Loaded price grid override for grade '{}'", name);
            table.insert(name, grid);
        }
        table.ensure_default()?;
        Ok(table)
    }

    pub fn insert(&mut self, grade: &str, grid: PriceGrid) {
        self.grids.insert(Grade::new(grade), grid);
    }

    fn ensure_default(&self) -> Result<(), PricingError> {
        if self.grids.contains_key(&self.default_grade) {
            Ok(())
        } else {
            Err(PricingError::MissingDefault(self.default_grade.to_string()))
        }
    }

    pub fn default_grade(&self) -> &Grade {
        &self.default_grade
    }

    /// Grid for `grade`, or the default grade's grid on a miss.
    pub fn resolve(&self, grade: &str) -> (&Grade, &PriceGrid) {
        let wanted = Grade::new(grade);
        match self.grids.get_key_value(&wanted) {
            Some((grade, grid)) => (grade, grid),
            None => {
                let grid = self
                    .grids
                    .get(&self.default_grade)
                    .unwrap_or(&STANDARD_DEFAULT_GRID);
                (&self.default_grade, grid)
            }
        }
    }

    pub fn contains(&self, grade: &str) -> bool {
        self.grids.contains_key(&Grade::new(grade))
    }

    /// Known grades, sorted by their 1g price.
    pub fn grades(&self) -> Vec<(&Grade, &PriceGrid)> {
        let mut grades: Vec<_> = self.grids.iter().collect();
        grades.sort_by(|a, b| a.1.at_1.cmp(&b.1.at_1).then_with(|| a.0.cmp(b.0)));
        grades
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::standard()
    }
}

// Backstop for `resolve`; every constructor keeps the default grade present.
static STANDARD_DEFAULT_GRID: PriceGrid = PriceGrid::fixed(300, 1300, 2000, 3500);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_grade_normalization() {
        assert_eq!(Grade::new("  Selected   PREMIUM ").as_str(), "selected premium");
        assert_eq!(Grade::new("Golden"), Grade::new("golden "));
    }

    #[test]
    fn test_standard_table_resolves_known_grade() {
        let table = PricingTable::standard();
        let (grade, grid) = table.resolve("Silver");
        assert_eq!(grade.as_str(), "silver");
        assert_eq!(grid.at_1, 150);
        assert_eq!(grid.at_20, 2000);
    }

    #[test]
    fn test_unknown_grade_falls_back_to_default() {
        let table = PricingTable::standard();
        let (grade, grid) = table.resolve("not-a-grade");
        assert_eq!(grade.as_str(), DEFAULT_GRADE);
        assert_eq!(grid, table.resolve("premium").1);
    }

    #[test]
    fn test_non_monotonic_grid_rejected() {
        let result = PriceGrid::new("broken", 300, 200, 2000, 3500);
        assert!(matches!(
            result,
            Err(PricingError::NonMonotonic { from: 1, to: 5, .. })
        ));
    }

    #[test]
    fn test_standard_grids_are_monotonic() {
        let table = PricingTable::standard();
        for (grade, grid) in table.grades() {
            assert!(grid.check_monotonic(grade.as_str()).is_ok());
        }
    }

    #[test]
    fn test_grades_sorted_by_entry_price() {
        let table = PricingTable::standard();
        let names: Vec<&str> = table.grades().iter().map(|(g, _)| g.as_str()).collect();
        assert_eq!(names, vec!["silver", "golden", "premium", "selected premium"]);
    }

    #[test]
    fn test_overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"Platinum": {{"1": 500, "5": 2000, "10": 3500, "20": 6000}}}}"#
        )
        .unwrap();

        let table = PricingTable::with_overrides_from_file(file.path()).unwrap();
        assert!(table.contains("platinum"));
        assert!(table.contains("silver"));
        assert_eq!(table.resolve("PLATINUM").1.at_5, 2000);
    }

    #[test]
    fn test_overrides_missing_anchor_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"platinum": {{"1": 500, "5": 2000, "10": 3500}}}}"#).unwrap();

        let result = PricingTable::with_overrides_from_file(file.path());
        assert!(matches!(
            result,
            Err(PricingError::MissingAnchor { quantity: 20, .. })
        ));
    }

    #[test]
    fn test_overrides_unknown_anchor_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"platinum": {{"1": 500, "3": 900, "5": 2000, "10": 3500, "20": 6000}}}}"#
        )
        .unwrap();

        let result = PricingTable::with_overrides_from_file(file.path());
        assert!(matches!(result, Err(PricingError::UnknownAnchor { .. })));
    }
}
