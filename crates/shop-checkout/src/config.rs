//! # Simulator Configuration
//!
//! Timing and outcome odds for the mock payment flow.
//! Values come from environment variables, falling back to the defaults
//! the storefront ships with.

use shop_core::ShopError;
use std::env;
use std::time::Duration;

/// Default time spent in `Processing`
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(2000);

/// Default pause between `Success` and the completion callback
pub const DEFAULT_COMPLETION_DELAY: Duration = Duration::from_millis(2000);

/// Default probability that a simulated payment goes through
pub const DEFAULT_SUCCESS_PROBABILITY: f64 = 0.90;

/// Checkout simulator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Simulated network latency before the outcome is drawn
    pub processing_delay: Duration,

    /// Delay before the success callback fires
    pub completion_delay: Duration,

    /// Chance in `[0, 1]` that a draw is approved
    pub success_probability: f64,
}

impl SimulatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `CHECKOUT_PROCESSING_DELAY_MS`
    /// - `CHECKOUT_COMPLETION_DELAY_MS`
    /// - `CHECKOUT_SUCCESS_PROBABILITY`
    pub fn from_env() -> Result<Self, ShopError> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(ms) = read_var::<u64>("CHECKOUT_PROCESSING_DELAY_MS")? {
            config.processing_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = read_var::<u64>("CHECKOUT_COMPLETION_DELAY_MS")? {
            config.completion_delay = Duration::from_millis(ms);
        }
        if let Some(p) = read_var::<f64>("CHECKOUT_SUCCESS_PROBABILITY")? {
            config = config.with_success_probability(p)?;
        }

        Ok(config)
    }

    /// Builder: set both delays
    pub fn with_delays(mut self, processing: Duration, completion: Duration) -> Self {
        self.processing_delay = processing;
        self.completion_delay = completion;
        self
    }

    /// Builder: set the approval odds
    pub fn with_success_probability(mut self, probability: f64) -> Result<Self, ShopError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ShopError::Configuration(format!(
                "success probability must be within 0..=1, got {probability}"
            )));
        }
        self.success_probability = probability;
        Ok(self)
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            processing_delay: DEFAULT_PROCESSING_DELAY,
            completion_delay: DEFAULT_COMPLETION_DELAY,
            success_probability: DEFAULT_SUCCESS_PROBABILITY,
        }
    }
}

fn read_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ShopError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ShopError::Configuration(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}
