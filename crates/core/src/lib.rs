//! Atelier Core - pure domain logic for the furniture configurator.
//!
//! This crate provides the types and rules shared by every Atelier component:
//! - `storefront` - JSON API for the configurator, cart and checkout
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Persistence lives in the storefront crate and calls into the
//! planning functions here inside its own transactions.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, currency rounding, dimensions, configuration records
//! - [`catalog`] - Products, configurable parts and option grouping
//! - [`pricing`] - The configurator pricing engine
//! - [`cart`] - Cart lines and the add/update merge rules
//! - [`order`] - Orders and the cart-to-order materializer
//! - [`error`] - Domain error taxonomy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod pricing;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use types::*;
