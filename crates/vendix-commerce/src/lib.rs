//! # vendix-commerce
//!
//! Catalog, cart, checkout, invoice, and analytics services.
//!
//! Every service here follows the same shape: accept a [`vendix_core::Principal`]
//! for the operations that need one, authorize with [`vendix_auth::policy`],
//! read/write through the `vendix-repo` traits, and read-through the cache
//! via [`vendix_cache::TypedCache`] where the spec calls for it.
//!
//! ## Module Organization
//!
//! - [`users`]: Registration, profile management, delivery addresses.
//! - [`catalog`]: Product CRUD (C6).
//! - [`cart`]: Per-user cart lifecycle (C7).
//! - [`checkout`]: Cart-to-sale conversion (C8).
//! - [`invoice`]: Invoice CRUD (C9).
//! - [`analytics`]: Admin sales reporting (C11).

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod invoice;
pub mod users;
