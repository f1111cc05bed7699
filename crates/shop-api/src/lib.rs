//! # shop-api
//!
//! HTTP API layer for the storefront.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Session-scoped cart endpoints with partner pricing
//! - Mock checkout endpoints driven by `shop-checkout`
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/services` | List services |
//! | POST | `/api/v1/sessions` | Open a browsing session |
//! | GET | `/api/v1/sessions/{sid}/cart` | Cart and totals |
//! | POST | `/api/v1/sessions/{sid}/cart/items` | Add to cart |
//! | POST | `/api/v1/sessions/{sid}/checkout` | Pay |
//! | GET | `/api/v1/sessions/{sid}/checkout` | Attempt status |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, SessionRegistry};
