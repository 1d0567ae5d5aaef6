//! The Excuse service.
//!
//! [`contract`] is the only module a client needs; [`server`] implements it
//! over an in-memory store.

pub mod contract;
pub mod server;
