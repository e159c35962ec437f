//! Shopping cart for the storefront core.
//!
//! A cart is a per-user map of SKU id to quantity. [`CartStore`] is the raw
//! keyed collection; [`CartService`] validates quantities against the
//! catalog and produces the totals shown to the shopper.

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod service;
pub mod store;

pub use error::{CartError, Result};
pub use memory::InMemoryCartStore;
pub use redis_store::RedisCartStore;
pub use service::{CartLine, CartService, CartView, parse_quantity};
pub use store::CartStore;
