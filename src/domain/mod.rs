//! Domain types: value objects and the catalog/order entities.

pub mod catalog;
pub mod order;
pub mod value_objects;

pub use catalog::{Category, Product, ProductDraft};
pub use order::{CartLine, Order, OrderItem, ShippingDetails};
pub use value_objects::{Money, Sku};
