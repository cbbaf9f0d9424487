//! HTTP Surface
//!
//! Route table and probe handlers.

pub mod handlers;
pub mod routes;
