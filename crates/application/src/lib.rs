//! Portico Application - Client orchestration and ports
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for external dependencies)
//! - The authenticated client and its refresh coordination
//! - The typed endpoint surface

pub mod client;
pub mod config;
pub mod endpoints;
pub mod ports;

pub use client::{ApiClient, SessionExpiredHook};
pub use config::ClientConfig;
pub use ports::{HttpTransport, TokenStore};
