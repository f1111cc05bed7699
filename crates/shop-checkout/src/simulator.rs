//! # Checkout Simulator
//!
//! Timer-driven state machine standing in for a payment gateway.
//!
//! ```text
//!   begin ──► Input ──pay──► Processing ──approved──► Success ──(delay)──► on_success
//!              ▲  │                │
//!              │  cancel           └──declined──► Failed
//!              │  ▼                                 │
//!           (discarded)  ◄──────── cancel ──────────┤
//!              ▲                                    │
//!              └────────────── retry ───────────────┘
//! ```
//!
//! Each attempt owns a [`CancellationToken`]. Starting a new attempt, calling
//! [`CheckoutSimulator::shutdown`] or dropping the simulator cancels it, so a
//! timer scheduled for an older attempt never touches the cart or the state.

use crate::attempt::{CheckoutAttempt, CheckoutReceipt, CheckoutStatus};
use crate::cancel::CancellationToken;
use crate::config::SimulatorConfig;
use crate::listener::{BoxedCheckoutListener, LoggingListener};
use crate::outcome::{BoxedOutcomeSource, PaymentOutcome, RandomOutcome};
use shop_core::{Price, ShopError, ShopResult, ShopSession};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Slot {
    attempt: Option<CheckoutAttempt>,
    token: CancellationToken,
}

struct Inner {
    session: ShopSession,
    config: SimulatorConfig,
    outcome: BoxedOutcomeSource,
    listener: BoxedCheckoutListener,
    // Never held across an await
    slot: Mutex<Slot>,
    updates: watch::Sender<Option<CheckoutAttempt>>,
}

impl Inner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, attempt: Option<CheckoutAttempt>) {
        self.updates.send_replace(attempt);
    }
}

/// Builder for [`CheckoutSimulator`]
pub struct CheckoutSimulatorBuilder {
    session: ShopSession,
    config: SimulatorConfig,
    outcome: Option<BoxedOutcomeSource>,
    listener: Option<BoxedCheckoutListener>,
}

impl CheckoutSimulatorBuilder {
    pub fn config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the random draw, e.g. with a fixed outcome in tests
    pub fn outcome(mut self, outcome: BoxedOutcomeSource) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn listener(mut self, listener: BoxedCheckoutListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn build(self) -> CheckoutSimulator {
        let outcome: BoxedOutcomeSource = match self.outcome {
            Some(outcome) => outcome,
            None => Arc::new(RandomOutcome::new(self.config.success_probability)),
        };
        let listener: BoxedCheckoutListener = match self.listener {
            Some(listener) => listener,
            None => Arc::new(LoggingListener),
        };
        let (updates, _) = watch::channel(None);

        CheckoutSimulator {
            inner: Arc::new(Inner {
                session: self.session,
                config: self.config,
                outcome,
                listener,
                slot: Mutex::new(Slot::default()),
                updates,
            }),
        }
    }
}

/// Mock checkout bound to one browsing session.
///
/// `pay` spawns the timers on the current tokio runtime.
pub struct CheckoutSimulator {
    inner: Arc<Inner>,
}

impl CheckoutSimulator {
    pub fn builder(session: ShopSession) -> CheckoutSimulatorBuilder {
        CheckoutSimulatorBuilder {
            session,
            config: SimulatorConfig::default(),
            outcome: None,
            listener: None,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &ShopSession {
        &self.inner.session
    }

    /// Start a fresh attempt at `Input` for a fixed amount.
    ///
    /// Any previous attempt is discarded and its timers cancelled.
    pub fn begin(&self, amount: Price) -> CheckoutAttempt {
        let mut slot = self.inner.lock_slot();
        start_attempt(&mut slot, amount, &self.inner)
    }

    /// Start an attempt for the session's current total, discount included
    pub async fn begin_from_cart(&self) -> ShopResult<CheckoutAttempt> {
        let summary = self.inner.session.summary().await;
        if summary.count == 0 {
            return Err(ShopError::EmptyCart);
        }
        Ok(self.begin(summary.total))
    }

    /// `Input → Processing`. The outcome is drawn after the processing delay.
    #[instrument(skip(self))]
    pub fn pay(&self) -> ShopResult<CheckoutAttempt> {
        let slot = self.inner.lock_slot();
        self.pay_locked(slot)
    }

    /// Pay the open attempt, or start one from the cart when there is none.
    ///
    /// An attempt at `Input` is paid with its frozen amount. A new attempt is
    /// only started when there is no attempt or the last one completed;
    /// `Processing`, `Failed` and a pending `Success` are rejected.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> ShopResult<CheckoutAttempt> {
        let summary = self.inner.session.summary().await;
        let mut slot = self.inner.lock_slot();
        match slot.attempt.as_ref() {
            Some(attempt) if attempt.status == CheckoutStatus::Input => {}
            Some(attempt) if !(attempt.status == CheckoutStatus::Success && attempt.completed) => {
                return Err(attempt.status.reject("pay"));
            }
            _ => {
                if summary.count == 0 {
                    return Err(ShopError::EmptyCart);
                }
                start_attempt(&mut slot, summary.total, &self.inner);
            }
        }
        self.pay_locked(slot)
    }

    fn pay_locked(&self, mut slot: MutexGuard<'_, Slot>) -> ShopResult<CheckoutAttempt> {
        let attempt = slot.attempt.as_mut().ok_or(ShopError::NoActiveAttempt)?;
        if attempt.status != CheckoutStatus::Input {
            return Err(attempt.status.reject("pay"));
        }
        attempt.status = CheckoutStatus::Processing;
        let snapshot = attempt.clone();
        let token = slot.token.clone();
        self.inner.publish(Some(snapshot.clone()));
        drop(slot);

        info!(attempt = %snapshot.id, amount = %snapshot.amount.display(), "Processing payment");
        tokio::spawn(run_attempt(Arc::clone(&self.inner), snapshot.id, token));
        Ok(snapshot)
    }

    /// `Failed → Input`. The cart is not touched.
    pub fn retry(&self) -> ShopResult<CheckoutAttempt> {
        let mut slot = self.inner.lock_slot();
        let attempt = slot.attempt.as_mut().ok_or(ShopError::NoActiveAttempt)?;
        if attempt.status != CheckoutStatus::Failed {
            return Err(attempt.status.reject("retry"));
        }
        attempt.status = CheckoutStatus::Input;
        let snapshot = attempt.clone();
        self.inner.publish(Some(snapshot.clone()));
        info!(attempt = %snapshot.id, "Checkout retry");
        Ok(snapshot)
    }

    /// Abandon the attempt from `Input` or `Failed`. The cart is not touched.
    pub fn cancel(&self) -> ShopResult<CheckoutAttempt> {
        let mut slot = self.inner.lock_slot();
        let status = slot
            .attempt
            .as_ref()
            .map(|attempt| attempt.status)
            .ok_or(ShopError::NoActiveAttempt)?;
        if !matches!(status, CheckoutStatus::Input | CheckoutStatus::Failed) {
            return Err(status.reject("cancel"));
        }
        slot.token.cancel();
        let attempt = slot.attempt.take().ok_or(ShopError::NoActiveAttempt)?;
        self.inner.publish(None);
        info!(attempt = %attempt.id, "Checkout cancelled");
        Ok(attempt)
    }

    /// Teardown: cancel outstanding timers and discard the attempt
    pub fn shutdown(&self) {
        let mut slot = self.inner.lock_slot();
        slot.token.cancel();
        if let Some(attempt) = slot.attempt.take() {
            debug!(attempt = %attempt.id, status = %attempt.status, "Checkout torn down");
            self.inner.publish(None);
        }
    }

    pub fn attempt(&self) -> Option<CheckoutAttempt> {
        self.inner.lock_slot().attempt.clone()
    }

    pub fn status(&self) -> Option<CheckoutStatus> {
        self.inner.lock_slot().attempt.as_ref().map(|a| a.status)
    }

    /// Watch every state change
    pub fn subscribe(&self) -> watch::Receiver<Option<CheckoutAttempt>> {
        self.inner.updates.subscribe()
    }

    /// Wait until the current attempt is no longer `Processing`
    pub async fn settled(&self) -> Option<CheckoutAttempt> {
        let mut updates = self.subscribe();
        let result = updates
            .wait_for(|attempt| !attempt.as_ref().is_some_and(CheckoutAttempt::is_processing))
            .await
            .map(|attempt| attempt.clone());
        match result {
            Ok(attempt) => attempt,
            Err(_) => self.attempt(),
        }
    }
}

impl Drop for CheckoutSimulator {
    fn drop(&mut self) {
        self.inner.lock_slot().token.cancel();
    }
}

fn start_attempt(slot: &mut Slot, amount: Price, inner: &Inner) -> CheckoutAttempt {
    let attempt = CheckoutAttempt::new(amount);
    slot.token.cancel();
    slot.token = CancellationToken::new();
    if let Some(previous) = slot.attempt.replace(attempt.clone()) {
        debug!(previous = %previous.id, status = %previous.status, "Replaced checkout attempt");
    }
    inner.publish(Some(attempt.clone()));
    info!(attempt = %attempt.id, amount = %amount.display(), "Checkout attempt started");
    attempt
}

/// Timers for one attempt: processing delay, outcome, completion delay
async fn run_attempt(inner: Arc<Inner>, attempt_id: Uuid, token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => {
            debug!(attempt = %attempt_id, "Processing timer cancelled");
            return;
        }
        _ = tokio::time::sleep(inner.config.processing_delay) => {}
    }

    let outcome = inner.outcome.draw();
    debug!(attempt = %attempt_id, source = inner.outcome.source_name(), ?outcome, "Outcome drawn");

    // Cart before slot; the cart clear and the status change land together.
    let resolved = {
        let cart = inner.session.cart();
        let mut cart = cart.write().await;
        let mut slot = inner.lock_slot();
        if token.is_cancelled() {
            return;
        }
        let Some(attempt) = slot.attempt.as_mut().filter(|a| a.id == attempt_id) else {
            return;
        };
        attempt.status = match outcome {
            PaymentOutcome::Approved => {
                cart.clear();
                CheckoutStatus::Success
            }
            PaymentOutcome::Declined => CheckoutStatus::Failed,
        };
        let snapshot = attempt.clone();
        inner.publish(Some(snapshot.clone()));
        snapshot
    };

    if resolved.status == CheckoutStatus::Failed {
        warn!(attempt = %attempt_id, "Simulated payment declined");
        inner.listener.on_failed(&resolved);
        return;
    }
    info!(attempt = %attempt_id, amount = %resolved.amount.display(), "Simulated payment approved");

    tokio::select! {
        _ = token.cancelled() => {
            debug!(attempt = %attempt_id, "Completion timer cancelled");
            return;
        }
        _ = tokio::time::sleep(inner.config.completion_delay) => {}
    }

    let receipt = {
        let mut slot = inner.lock_slot();
        if token.is_cancelled() {
            return;
        }
        let Some(attempt) = slot
            .attempt
            .as_mut()
            .filter(|a| a.id == attempt_id && a.status == CheckoutStatus::Success && !a.completed)
        else {
            return;
        };
        attempt.completed = true;
        let receipt = CheckoutReceipt::from(&*attempt);
        inner.publish(Some(attempt.clone()));
        receipt
    };

    inner.listener.on_success(&receipt);
}
