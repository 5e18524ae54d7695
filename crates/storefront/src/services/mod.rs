//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`configurator`] - Option listing and live price preview
//! - [`cart`] - Add, update and remove cart lines with frozen prices
//! - [`checkout`] - Order placement and lookup
//!
//! Services borrow the [`CommerceStore`](crate::store::CommerceStore) from the
//! application state and return [`StoreResult`](crate::store::StoreResult).
//! Route handlers decide how storage failures are reported.

pub mod cart;
pub mod checkout;
pub mod configurator;

pub use cart::{AddToCart, CartService};
pub use checkout::{Checkout, CheckoutService};
pub use configurator::ConfiguratorService;
