//! Plumbing shared by portal services: tracing setup, health probes, request ids.

pub mod health;
pub mod middleware;
pub mod tracing;
