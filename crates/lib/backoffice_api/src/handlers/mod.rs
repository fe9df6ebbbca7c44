//! Request handlers.

pub mod auth;
pub mod companies;
pub mod financials;
pub mod users;
