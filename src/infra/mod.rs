//! Infrastructure adapters and runtime bootstrap.

pub mod cloudflare_kv;
pub mod db;
pub mod error;
pub mod http;
pub mod rest;
pub mod telemetry;
