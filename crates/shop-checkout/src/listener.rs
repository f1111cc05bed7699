//! # Checkout Listeners
//!
//! Callbacks fired when an attempt resolves. The success callback is where
//! the caller navigates away to the post-purchase view.

use crate::attempt::{CheckoutAttempt, CheckoutReceipt};
use std::sync::Arc;
use tracing::{info, warn};

/// Checkout event listener trait
///
/// Implement this trait to react to resolved attempts. Both methods run
/// outside the simulator's locks.
#[allow(unused_variables)]
pub trait CheckoutListener: Send + Sync {
    /// Called once per successful attempt, after the completion delay
    fn on_success(&self, receipt: &CheckoutReceipt) {
        info!(
            "Checkout completed: attempt={}, amount={}",
            receipt.attempt_id,
            receipt.amount.display()
        );
    }

    /// Called when the simulated payment is declined
    fn on_failed(&self, attempt: &CheckoutAttempt) {
        warn!("Checkout declined: attempt={}", attempt.id);
    }
}

/// Type alias for a shared listener (dynamic dispatch)
pub type BoxedCheckoutListener = Arc<dyn CheckoutListener>;

/// Default listener that only logs events
pub struct LoggingListener;

impl CheckoutListener for LoggingListener {}

/// Adapts a closure into a success callback
pub struct OnSuccess<F>(pub F);

impl<F> CheckoutListener for OnSuccess<F>
where
    F: Fn(&CheckoutReceipt) + Send + Sync,
{
    fn on_success(&self, receipt: &CheckoutReceipt) {
        (self.0)(receipt)
    }
}
