//! # Checkout Attempt
//!
//! State of the single in-flight checkout attempt.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shop_core::{Price, ShopError};
use uuid::Uuid;

/// Where an attempt sits in the checkout flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Payment form shown, waiting for the user to pay
    Input,
    /// Simulated payment in flight
    Processing,
    /// Paid; the cart has been cleared
    Success,
    /// Simulated decline; the user may retry
    Failed,
}

impl CheckoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStatus::Input => "input",
            CheckoutStatus::Processing => "processing",
            CheckoutStatus::Success => "success",
            CheckoutStatus::Failed => "failed",
        }
    }

    /// Error for `action` attempted from this state
    pub(crate) fn reject(self, action: &str) -> ShopError {
        ShopError::InvalidTransition {
            from: self.as_str().to_string(),
            action: action.to_string(),
        }
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checkout attempt. The amount is fixed when the attempt begins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutAttempt {
    pub id: Uuid,
    pub status: CheckoutStatus,
    pub amount: Price,
    pub started_at: DateTime<Utc>,
    /// Set once the success callback has fired
    pub completed: bool,
}

impl CheckoutAttempt {
    pub(crate) fn new(amount: Price) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: CheckoutStatus::Input,
            amount,
            started_at: Utc::now(),
            completed: false,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.status == CheckoutStatus::Processing
    }
}

/// Handed to the success callback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutReceipt {
    pub attempt_id: Uuid,
    pub amount: Price,
    pub completed_at: DateTime<Utc>,
}

impl From<&CheckoutAttempt> for CheckoutReceipt {
    fn from(attempt: &CheckoutAttempt) -> Self {
        Self {
            attempt_id: attempt.id,
            amount: attempt.amount,
            completed_at: Utc::now(),
        }
    }
}
