//! Domain models shared by the services and the API layer.
//!
//! These are internal domain models; request bodies live in the API crate.

pub mod auth;
pub mod company;
