//! Grocery storefront core.
//!
//! Wires the cart, settlement engine, order service and payment reconciler
//! over in-memory or PostgreSQL/Redis backends, and provides configuration,
//! tracing setup and a serializable error body for the layer that serves
//! requests.

pub mod app;
pub mod config;
pub mod error;
pub mod telemetry;

pub use app::{Storefront, connect_postgres};
pub use config::{Config, LogFormat};
pub use error::{ErrorBody, StorefrontError};
