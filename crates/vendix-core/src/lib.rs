//! # vendix-core
//!
//! Shared domain model, unified error type, and environment-backed
//! configuration for the vendix commerce core.
//!
//! ## Module Organization
//!
//! - [`error`]: Unified [`VendixError`](error::VendixError) taxonomy with
//!   HTTP-status mapping.
//! - [`model`]: Domain entities (users, products, carts, sales, invoices).
//! - [`principal`]: The authenticated identity carried through a request.
//! - [`config`]: Environment-variable configuration, following the teacher's
//!   `from_env()` convention.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod model;
pub mod principal;

pub use error::{ErrorKind, VendixError, VendixResult};
pub use principal::Principal;
