//! Domain layer for the storefront core.
//!
//! Pure types and rules, no I/O:
//! - catalog entities (`Sku`, `Address`)
//! - order header/lines with the status state machine
//! - derived read views

pub mod catalog;
pub mod order;

pub use catalog::{Address, Sku};
pub use order::{
    Money, OrderError, OrderHeader, OrderId, OrderLine, OrderLineView, OrderStatus, OrderView,
    PayMethod, PaymentTransition, all_lines_commented, normalize_comment,
};
