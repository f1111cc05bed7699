//! # shop-core
//!
//! Core types for the storefront cart and checkout.
//!
//! This crate provides:
//! - `Service` and `ServiceCatalog` for the purchasable service catalog
//! - `CartLineItem` and `CartLedger` with derived subtotal/discount/total
//! - `ShopSession`, the session-scoped store owning the cart and login
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{AuthSession, CartLineItem, Role, ShopSession};
//!
//! let session = ShopSession::new();
//! let service = catalog.get("seo-starter").unwrap();
//! session.add_item(CartLineItem::from_service(service, 2)).await?;
//!
//! session.login(AuthSession::new("asha", Role::Partner)).await;
//! let summary = session.summary().await; // 20% partner discount applied
//! ```

pub mod cart;
pub mod error;
pub mod product;
pub mod session;

// Re-exports for convenience
pub use cart::{CartLedger, CartLineItem, CartSummary, PARTNER_DISCOUNT_PERCENT};
pub use error::{ShopError, ShopResult};
pub use product::{Currency, Price, Service, ServiceCatalog};
pub use session::{AuthSession, Role, SharedCart, ShopSession};
