use thiserror::Error;
use tracing::debug;

use crate::models::{
    cart::Selection,
    price_grid::{PriceGrid, PricingTable},
    product::Product,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PricingServiceError {
    #[error("'{product}' is sold by weight; choose a weight such as 5g")]
    WeightRequired { product: String },

    #[error("'{product}' is sold per piece; it cannot be bought as {selection}")]
    PieceOnly { product: String, selection: String },
}

/// Piecewise-linear price of `quantity` grams on `grid`, before rounding.
fn interpolate(grid: &PriceGrid, quantity: f64) -> f64 {
    let lerp = |from_qty: f64, from: u64, to_qty: f64, to: u64| {
        from as f64 + (to as f64 - from as f64) * ((quantity - from_qty) / (to_qty - from_qty))
    };

    if quantity <= 1.0 {
        grid.at_1 as f64 * quantity
    } else if quantity <= 5.0 {
        lerp(1.0, grid.at_1, 5.0, grid.at_5)
    } else if quantity <= 10.0 {
        lerp(5.0, grid.at_5, 10.0, grid.at_10)
    } else if quantity <= 20.0 {
        lerp(10.0, grid.at_10, 20.0, grid.at_20)
    } else {
        (grid.at_20 as f64 / 20.0) * quantity
    }
}

/// Price in whole baht for `quantity` grams of `grade`.
///
/// Unknown grades use the table's default grade. Non-positive or
/// non-finite quantities cost nothing.
pub fn price_for(table: &PricingTable, quantity: f64, grade: &str) -> u64 {
    if !quantity.is_finite() || quantity <= 0.0 {
        return 0;
    }
    let (_, grid) = table.resolve(grade);
    interpolate(grid, quantity).round() as u64
}

pub struct PricingService {
    table: PricingTable,
}

impl PricingService {
    pub fn new(table: PricingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PricingTable {
        &self.table
    }

    pub fn price_for(&self, quantity: f64, grade: &str) -> u64 {
        let price = price_for(&self.table, quantity, grade);
        debug!("Priced {}g of '{}' at {}", quantity, grade, price);
        price
    }

    /// Selection a product card starts on.
    pub fn default_selection(product: &Product) -> Selection {
        if product.is_weighed() {
            Selection::grams(1.0).unwrap_or(Selection::Piece)
        } else {
            Selection::Piece
        }
    }

    /// Unit price for one line of `product` at `selection`.
    ///
    /// Weighed products use an explicit tier price when the row has one for
    /// exactly this selection, otherwise the grade grid. Everything else is
    /// sold per piece at the base price.
    ///
    /// A tier price applies only at its own weight; neighbouring weights stay
    /// on the grid, so the curve may step at that tier.
    pub fn unit_price(
        &self,
        product: &Product,
        selection: &Selection,
    ) -> Result<u64, PricingServiceError> {
        match (product.is_weighed(), selection) {
            (true, Selection::Grams(weight)) => Ok(product
                .tier_price(selection)
                .unwrap_or_else(|| self.price_for(weight.grams(), &product.subcategory))),
            (true, Selection::Piece) => Err(PricingServiceError::WeightRequired {
                product: product.name.clone(),
            }),
            (false, Selection::Piece) => Ok(product.price),
            (false, Selection::Grams(_)) => Err(PricingServiceError::PieceOnly {
                product: product.name.clone(),
                selection: selection.to_string(),
            }),
        }
    }
}

impl Default for PricingService {
    fn default() -> Self {
        Self::new(PricingTable::standard())
    }
}
