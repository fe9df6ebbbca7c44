//! # backoffice_core
//!
//! Authentication and authorization core of the back-office API, plus the
//! company, financial and user services it gates.

pub mod auth;
pub mod companies;
pub mod financials;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod services;
pub mod users;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
