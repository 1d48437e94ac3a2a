//! kvedge: an edge HTTP service that serves articles through a cache-aside
//! key-value store and keeps it fresh from origin change webhooks.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
