//! Shared types for the storefront core.

mod types;

pub use types::{AddressId, ErrorKind, ProductId, SkuId, UserId};
