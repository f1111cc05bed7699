//! # Outcome Sources
//!
//! Strategy trait deciding whether a simulated payment goes through.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │          OutcomeSource (trait)           │
//! │  ├── draw()                              │
//! │  └── source_name()                       │
//! └──────────────────────────────────────────┘
//!                      ▲
//!      ┌───────────────┼───────────────┬───────────────┐
//!      │               │               │               │
//! RandomOutcome  SeededOutcome   FixedOutcome  ScriptedOutcome
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use crate::config::DEFAULT_SUCCESS_PROBABILITY;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Result of one simulated payment draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Approved,
    Declined,
}

impl PaymentOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, PaymentOutcome::Approved)
    }
}

/// Source of simulated payment outcomes.
///
/// Each call to `draw` is an independent decision.
pub trait OutcomeSource: Send + Sync {
    fn draw(&self) -> PaymentOutcome;

    /// Short name for logging
    fn source_name(&self) -> &'static str;
}

/// Type alias for a shared outcome source (dynamic dispatch)
pub type BoxedOutcomeSource = Arc<dyn OutcomeSource>;

/// Clamp into `[0, 1]`; NaN falls back to the default rate
fn sanitize_probability(p: f64) -> f64 {
    if p.is_nan() {
        DEFAULT_SUCCESS_PROBABILITY
    } else {
        p.clamp(0.0, 1.0)
    }
}

fn outcome_from(approved: bool) -> PaymentOutcome {
    if approved {
        PaymentOutcome::Approved
    } else {
        PaymentOutcome::Declined
    }
}

/// Draws from the thread-local RNG
#[derive(Debug, Clone)]
pub struct RandomOutcome {
    success_probability: f64,
}

impl RandomOutcome {
    /// `success_probability` is clamped into `[0, 1]`; NaN means the default
    pub fn new(success_probability: f64) -> Self {
        Self {
            success_probability: sanitize_probability(success_probability),
        }
    }
}

impl OutcomeSource for RandomOutcome {
    fn draw(&self) -> PaymentOutcome {
        outcome_from(rand::rng().random_bool(self.success_probability))
    }

    fn source_name(&self) -> &'static str {
        "random"
    }
}

/// Reproducible draws from a seeded generator
#[derive(Debug)]
pub struct SeededOutcome {
    success_probability: f64,
    rng: Mutex<StdRng>,
}

impl SeededOutcome {
    pub fn new(seed: u64, success_probability: f64) -> Self {
        Self {
            success_probability: sanitize_probability(success_probability),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl OutcomeSource for SeededOutcome {
    fn draw(&self) -> PaymentOutcome {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        outcome_from(rng.random_bool(self.success_probability))
    }

    fn source_name(&self) -> &'static str {
        "seeded"
    }
}

/// Always returns the same outcome
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcome(pub PaymentOutcome);

impl FixedOutcome {
    pub fn approve() -> Self {
        Self(PaymentOutcome::Approved)
    }

    pub fn decline() -> Self {
        Self(PaymentOutcome::Declined)
    }
}

impl OutcomeSource for FixedOutcome {
    fn draw(&self) -> PaymentOutcome {
        self.0
    }

    fn source_name(&self) -> &'static str {
        "fixed"
    }
}

/// Plays back a queue of outcomes, then repeats the fallback
#[derive(Debug)]
pub struct ScriptedOutcome {
    queue: Mutex<VecDeque<PaymentOutcome>>,
    fallback: PaymentOutcome,
}

impl ScriptedOutcome {
    pub fn new(script: impl IntoIterator<Item = PaymentOutcome>, fallback: PaymentOutcome) -> Self {
        Self {
            queue: Mutex::new(script.into_iter().collect()),
            fallback,
        }
    }
}

impl OutcomeSource for ScriptedOutcome {
    fn draw(&self) -> PaymentOutcome {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(self.fallback)
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_outcome() {
        assert!(FixedOutcome::approve().draw().is_approved());
        assert!(!FixedOutcome::decline().draw().is_approved());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = SeededOutcome::new(42, 0.9);
        let b = SeededOutcome::new(42, 0.9);

        let left: Vec<_> = (0..32).map(|_| a.draw()).collect();
        let right: Vec<_> = (0..32).map(|_| b.draw()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_probability_extremes() {
        let always = RandomOutcome::new(1.0);
        let never = RandomOutcome::new(0.0);

        assert!((0..100).all(|_| always.draw().is_approved()));
        assert!((0..100).all(|_| !never.draw().is_approved()));
    }

    #[test]
    fn test_success_rate_near_ninety_percent() {
        let source = SeededOutcome::new(7, 0.9);
        let approved = (0..10_000).filter(|_| source.draw().is_approved()).count();

        assert!((8_700..=9_300).contains(&approved), "approved {approved} of 10000");
    }

    #[test]
    fn test_scripted_then_fallback() {
        let source = ScriptedOutcome::new(
            [PaymentOutcome::Declined, PaymentOutcome::Declined],
            PaymentOutcome::Approved,
        );

        assert_eq!(source.draw(), PaymentOutcome::Declined);
        assert_eq!(source.draw(), PaymentOutcome::Declined);
        assert_eq!(source.draw(), PaymentOutcome::Approved);
    }

    #[test]
    fn test_nan_probability_uses_default_rate() {
        let random = RandomOutcome::new(f64::NAN);
        assert_eq!(random.success_probability, DEFAULT_SUCCESS_PROBABILITY);
        (0..100).for_each(|_| {
            random.draw();
        });

        let seeded = SeededOutcome::new(7, f64::NAN);
        let approved = (0..10_000).filter(|_| seeded.draw().is_approved()).count();
        assert!((8_700..=9_300).contains(&approved), "approved {approved} of 10000");

        assert_eq!(RandomOutcome::new(4.0).success_probability, 1.0);
        assert_eq!(RandomOutcome::new(-1.0).success_probability, 0.0);
    }
}
