//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod configuration;
pub mod dimensions;
pub mod id;
pub mod price;
pub mod status;

pub use configuration::{ConfigurationRecord, PartKind};
pub use dimensions::Dimensions;
pub use id::*;
pub use price::CurrencyCode;
pub use status::OrderStatus;
