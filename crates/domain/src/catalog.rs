//! Catalog entities read by the cart and the settlement engine.

use common::{AddressId, ProductId, SkuId, UserId};
use serde::{Deserialize, Serialize};

use crate::order::Money;

/// A stock-keeping unit with its inventory counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub id: SkuId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    /// Units available for sale; never negative.
    pub stock: u32,
    /// Units sold through settled orders; only ever increases.
    pub sales: u32,
}

impl Sku {
    /// Returns true if `count` units can be taken from stock.
    pub fn can_supply(&self, count: u32) -> bool {
        count <= self.stock
    }
}

/// A shipping address owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub receiver: String,
    pub addr: String,
    pub zip_code: Option<String>,
    pub phone: String,
    pub is_default: bool,
}
