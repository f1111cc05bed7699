//! # shop-checkout
//!
//! Simulated checkout for the storefront.
//!
//! There is no payment gateway behind this crate. A [`CheckoutSimulator`]
//! holds the payment form in `Input`, waits out a fixed processing delay,
//! then draws an outcome from an [`OutcomeSource`] (90% approval by default):
//!
//! - approved: the session cart is cleared, the attempt moves to `Success`,
//!   and after a further delay the [`CheckoutListener`] success callback fires
//! - declined: the attempt moves to `Failed` and waits for an explicit retry
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_checkout::{CheckoutSimulator, OnSuccess, SimulatorConfig};
//! use std::sync::Arc;
//!
//! let simulator = CheckoutSimulator::builder(session.clone())
//!     .config(SimulatorConfig::from_env()?)
//!     .listener(Arc::new(OnSuccess(|receipt| println!("paid {}", receipt.amount.display()))))
//!     .build();
//!
//! simulator.begin_from_cart().await?;
//! simulator.pay()?;
//! let attempt = simulator.settled().await;
//! ```

pub mod attempt;
pub mod cancel;
pub mod config;
pub mod listener;
pub mod outcome;
pub mod simulator;

// Re-exports
pub use attempt::{CheckoutAttempt, CheckoutReceipt, CheckoutStatus};
pub use cancel::CancellationToken;
pub use config::SimulatorConfig;
pub use listener::{BoxedCheckoutListener, CheckoutListener, LoggingListener, OnSuccess};
pub use outcome::{
    BoxedOutcomeSource, FixedOutcome, OutcomeSource, PaymentOutcome, RandomOutcome,
    ScriptedOutcome, SeededOutcome,
};
pub use simulator::{CheckoutSimulator, CheckoutSimulatorBuilder};
