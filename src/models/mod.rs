pub mod cart;
pub mod order;
pub mod price_grid;
pub mod product;

pub use cart::*;
pub use order::*;
pub use price_grid::*;
pub use product::*;
