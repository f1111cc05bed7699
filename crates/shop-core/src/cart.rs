//! # Cart Ledger
//!
//! Line items selected during a browsing session and the totals derived
//! from them. Totals are never stored; every read recomputes them.

use crate::error::{ShopError, ShopResult};
use crate::product::{Currency, Price, Service};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Discount granted to partner accounts, in percent of the subtotal
pub const PARTNER_DISCOUNT_PERCENT: i64 = 20;

/// A line item in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Catalog id, unique within the ledger
    pub id: String,

    /// Display label
    pub name: String,

    /// Unit price
    pub price: Price,

    /// Units selected, never below 1
    pub quantity: u32,

    /// Display-only feature bullets
    #[serde(default)]
    pub features: Vec<String>,
}

impl CartLineItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Price, quantity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
            features: Vec::new(),
        }
    }

    /// Create a line item from a catalog service
    pub fn from_service(service: &Service, quantity: u32) -> Self {
        Self {
            id: service.id.clone(),
            name: service.name.clone(),
            price: service.price,
            quantity,
            features: service.features.clone(),
        }
    }

    /// Price times quantity
    pub fn line_total(&self) -> ShopResult<Price> {
        self.price
            .amount
            .checked_mul(i64::from(self.quantity))
            .map(|amount| Price::from_minor(amount, self.price.currency))
            .ok_or_else(|| ShopError::InvalidPrice {
                item_id: self.id.clone(),
                message: "line total overflows".to_string(),
            })
    }
}

/// Derived totals, as shown on the cart page and the checkout form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub count: u32,
    pub subtotal: Price,
    pub discount: Price,
    pub total: Price,
}

/// Ordered set of line items keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartLedger {
    items: Vec<CartLineItem>,
}

impl CartLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a line item, merging quantities when the id is already present.
    pub fn add(&mut self, item: CartLineItem) -> ShopResult<()> {
        if item.quantity < 1 {
            return Err(ShopError::InvalidQuantity {
                item_id: item.id,
                quantity: item.quantity as i64,
            });
        }
        if item.price.amount < 0 {
            return Err(ShopError::InvalidPrice {
                item_id: item.id,
                message: format!("unit price {} is negative", item.price.amount),
            });
        }
        if let Some(currency) = self.currency() {
            if currency != item.price.currency {
                return Err(ShopError::CurrencyMismatch {
                    expected: currency.to_string(),
                    found: item.price.currency.to_string(),
                });
            }
        }

        match self.items.iter().position(|existing| existing.id == item.id) {
            Some(pos) => {
                let existing = &self.items[pos];
                let quantity = existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                    ShopError::InvalidQuantity {
                        item_id: item.id.clone(),
                        quantity: i64::from(existing.quantity) + i64::from(item.quantity),
                    }
                })?;
                let merged = CartLineItem {
                    quantity,
                    ..existing.clone()
                };
                self.check_totals(&merged)?;
                self.items[pos].quantity = quantity;
                debug!(item_id = %merged.id, quantity, "Merged cart line");
            }
            None => {
                self.check_totals(&item)?;
                debug!(item_id = %item.id, quantity = item.quantity, "Added cart line");
                self.items.push(item);
            }
        }
        Ok(())
    }

    /// Remove a line item; `None` if it was not in the cart
    pub fn remove(&mut self, id: &str) -> Option<CartLineItem> {
        let pos = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Set the quantity of a line item.
    ///
    /// Quantities below 1 are rejected and leave the item untouched; removal
    /// only happens through [`CartLedger::remove`]. Returns `Ok(false)` when
    /// the id is not in the cart.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) -> ShopResult<bool> {
        let invalid = || ShopError::InvalidQuantity {
            item_id: id.to_string(),
            quantity,
        };
        if quantity < 1 {
            return Err(invalid());
        }
        let quantity = u32::try_from(quantity).map_err(|_| invalid())?;

        let Some(pos) = self.items.iter().position(|item| item.id == id) else {
            return Ok(false);
        };
        let updated = CartLineItem {
            quantity,
            ..self.items[pos].clone()
        };
        self.check_totals(&updated)?;
        self.items[pos].quantity = quantity;
        Ok(true)
    }

    /// Rejects a line that would push the count or any total out of range
    fn check_totals(&self, candidate: &CartLineItem) -> ShopResult<()> {
        let overflow = |message: &str| ShopError::InvalidPrice {
            item_id: candidate.id.clone(),
            message: message.to_string(),
        };

        let mut subtotal: i64 = 0;
        let mut count: u32 = 0;
        let others = self.items.iter().filter(|item| item.id != candidate.id);
        for item in others.chain(std::iter::once(candidate)) {
            let line = item.line_total()?;
            subtotal = subtotal
                .checked_add(line.amount)
                .ok_or_else(|| overflow("cart subtotal overflows"))?;
            count = count
                .checked_add(item.quantity)
                .ok_or_else(|| ShopError::InvalidQuantity {
                    item_id: candidate.id.clone(),
                    quantity: i64::from(candidate.quantity),
                })?;
        }
        subtotal
            .checked_mul(PARTNER_DISCOUNT_PERCENT)
            .and_then(|scaled| scaled.checked_add(50))
            .ok_or_else(|| overflow("partner discount overflows"))?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total units across all lines (badge count)
    pub fn count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Currency of the ledger, fixed by its first line
    pub fn currency(&self) -> Option<Currency> {
        self.items.first().map(|item| item.price.currency)
    }

    pub fn subtotal(&self) -> Price {
        let amount = self.items.iter().fold(0i64, |sum, item| {
            sum.saturating_add(item.price.amount.saturating_mul(i64::from(item.quantity)))
        });
        Price::from_minor(amount, self.currency().unwrap_or_default())
    }

    /// Partner discount, rounded half-up to the smallest currency unit
    pub fn discount(&self, discount_eligible: bool) -> Price {
        let subtotal = self.subtotal();
        if !discount_eligible {
            return Price::zero(subtotal.currency);
        }
        let amount = subtotal
            .amount
            .saturating_mul(PARTNER_DISCOUNT_PERCENT)
            .saturating_add(50)
            / 100;
        Price::from_minor(amount, subtotal.currency)
    }

    pub fn total(&self, discount_eligible: bool) -> Price {
        let subtotal = self.subtotal();
        let discount = self.discount(discount_eligible);
        Price::from_minor(subtotal.amount - discount.amount, subtotal.currency)
    }

    pub fn summary(&self, discount_eligible: bool) -> CartSummary {
        CartSummary {
            count: self.count(),
            subtotal: self.subtotal(),
            discount: self.discount(discount_eligible),
            total: self.total(discount_eligible),
        }
    }
}
