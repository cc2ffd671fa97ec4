pub mod pricing_service;
pub mod cart_service;
pub mod catalog_service;
pub mod checkout_service;

pub use pricing_service::*;
pub use cart_service::*;
pub use catalog_service::*;
pub use checkout_service::*;
