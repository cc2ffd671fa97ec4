pub mod cart_storage;

pub use cart_storage::*;
