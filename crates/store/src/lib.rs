//! Persistence for the storefront core.
//!
//! The [`OrderStore`] trait hands out [`UnitOfWork`]s: one database
//! transaction each, with exclusive row locks on the SKUs and orders it
//! touches. Dropping a unit of work without committing discards every write.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{FailurePoint, InMemoryStore};
pub use postgres::PostgresStore;
pub use store::{AddressBook, Catalog, OrderStore, UnitOfWork};
