//! HTTP surface of the relay: webhook ingress, the diagnostic turn
//! endpoint and health.

pub mod app;
pub mod http;
