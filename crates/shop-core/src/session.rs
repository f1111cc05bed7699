//! # Session Store
//!
//! Session-scoped state handed explicitly to whatever needs it: the cart
//! ledger plus the signed-in account, if any. A `ShopSession` is cheap to
//! clone; every clone shares the same cart.

use crate::cart::{CartLedger, CartLineItem, CartSummary};
use crate::error::ShopResult;
use crate::product::Price;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Cart shared between display surfaces and the checkout simulator
pub type SharedCart = Arc<RwLock<CartLedger>>;

/// Account role, as returned by the auth backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Partner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Partner => "partner",
            Role::Admin => "admin",
        }
    }

    /// Dashboard the user lands on after a purchase
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Customer => "/dashboard/customer",
            Role::Partner => "/dashboard/partner",
            Role::Admin => "/dashboard/admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed-in account. Credentials are checked elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: String,
    #[serde(default)]
    pub role: Role,
}

impl AuthSession {
    pub fn new(user: impl Into<String>, role: Role) -> Self {
        Self {
            user: user.into(),
            role,
        }
    }

    /// Partners get the automatic checkout discount
    pub fn is_discount_eligible(&self) -> bool {
        self.role == Role::Partner
    }
}

/// One browsing session: its cart and the current login
#[derive(Debug, Clone, Default)]
pub struct ShopSession {
    cart: SharedCart,
    auth: Arc<RwLock<Option<AuthSession>>>,
}

impl ShopSession {
    /// Fresh session with an empty cart and nobody signed in
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: start signed in
    pub fn with_auth(self, auth: AuthSession) -> Self {
        Self {
            cart: self.cart,
            auth: Arc::new(RwLock::new(Some(auth))),
        }
    }

    /// Handle to the shared cart
    pub fn cart(&self) -> SharedCart {
        Arc::clone(&self.cart)
    }

    pub async fn auth(&self) -> Option<AuthSession> {
        self.auth.read().await.clone()
    }

    /// Replace the current login; the cart is kept
    pub async fn login(&self, auth: AuthSession) {
        info!(user = %auth.user, role = %auth.role, "Session signed in");
        *self.auth.write().await = Some(auth);
    }

    pub async fn logout(&self) {
        *self.auth.write().await = None;
    }

    pub async fn is_discount_eligible(&self) -> bool {
        self.auth
            .read()
            .await
            .as_ref()
            .map(AuthSession::is_discount_eligible)
            .unwrap_or(false)
    }

    /// Post-purchase view for the current login
    pub async fn dashboard_path(&self) -> &'static str {
        self.auth
            .read()
            .await
            .as_ref()
            .map(|auth| auth.role)
            .unwrap_or_default()
            .dashboard_path()
    }

    pub async fn add_item(&self, item: CartLineItem) -> ShopResult<()> {
        self.cart.write().await.add(item)
    }

    pub async fn remove_item(&self, id: &str) -> Option<CartLineItem> {
        self.cart.write().await.remove(id)
    }

    pub async fn update_quantity(&self, id: &str, quantity: i64) -> ShopResult<bool> {
        self.cart.write().await.update_quantity(id, quantity)
    }

    pub async fn clear_cart(&self) {
        self.cart.write().await.clear();
    }

    /// Copy of the ledger as it is right now
    pub async fn cart_snapshot(&self) -> CartLedger {
        self.cart.read().await.clone()
    }

    /// Totals for the current login, taken under a single read lock
    pub async fn summary(&self) -> CartSummary {
        let eligible = self.is_discount_eligible().await;
        self.cart.read().await.summary(eligible)
    }

    pub async fn total(&self) -> Price {
        self.summary().await.total
    }
}
