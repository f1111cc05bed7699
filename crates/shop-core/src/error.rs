//! # Storefront Error Types
//!
//! Typed error handling for the cart ledger and the checkout simulator.
//! All fallible operations return `Result<T, ShopError>`.

use thiserror::Error;

/// Core error type for cart and checkout operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopError {
    /// Quantity below the floor of one unit
    #[error("Invalid quantity {quantity} for {item_id}: must be at least 1")]
    InvalidQuantity { item_id: String, quantity: i64 },

    /// Negative unit price, or a total out of range
    #[error("Invalid price for {item_id}: {message}")]
    InvalidPrice { item_id: String, message: String },

    /// Line item priced in a different currency than the ledger
    #[error("Currency mismatch: ledger is {expected}, item is {found}")]
    CurrencyMismatch { expected: String, found: String },

    /// Service not found in catalog
    #[error("Service not found: {service_id}")]
    ServiceNotFound { service_id: String },

    /// Browsing session unknown or already ended
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Checkout action not allowed in the attempt's current state
    #[error("Cannot {action} while checkout is {from}")]
    InvalidTransition { from: String, action: String },

    /// Checkout action issued with no attempt in flight
    #[error("No active checkout attempt")]
    NoActiveAttempt,

    /// Nothing to pay for
    #[error("Cart is empty")]
    EmptyCart,

    /// Configuration errors (bad env values, unreadable catalog)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ShopError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::InvalidQuantity { .. } => 422,
            ShopError::InvalidPrice { .. } => 422,
            ShopError::CurrencyMismatch { .. } => 422,
            ShopError::ServiceNotFound { .. } => 404,
            ShopError::SessionNotFound { .. } => 404,
            ShopError::InvalidTransition { .. } => 409,
            ShopError::NoActiveAttempt => 409,
            ShopError::EmptyCart => 400,
            ShopError::Configuration(_) => 500,
        }
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;
