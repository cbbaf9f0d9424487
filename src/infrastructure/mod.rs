//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Redis connection and the persistence publisher
//! - Prometheus metrics

pub mod cache;
pub mod metrics;
