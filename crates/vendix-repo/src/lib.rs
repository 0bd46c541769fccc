//! # vendix-repo
//!
//! Abstract persistence contracts consumed by `vendix-commerce`, plus an
//! in-memory reference implementation.
//!
//! A production deployment plugs in its own `Repository` impls (SQL,
//! key-value, whatever) behind these same traits; nothing in
//! `vendix-commerce` depends on storage being in-process.
//!
//! ## Module Organization
//!
//! - [`error`]: [`error::RepoError`], the failure taxonomy every repository
//!   method returns.
//! - [`traits`]: The per-entity repository traits and the
//!   [`traits::WithTransaction`] atomicity combinator.
//! - [`memory`]: An in-memory `Store` implementing every trait, serializing
//!   transactions with a single `tokio::sync::Mutex` — the async analogue
//!   of SERIALIZABLE isolation.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod error;
pub mod memory;
pub mod traits;

pub use error::RepoError;
pub use memory::InMemoryStore;
pub use traits::{
    CartRepository, DeliveryAddressRepository, InvoiceRepository, ProductRepository,
    SaleRepository, UserRepository, WithTransaction,
};
