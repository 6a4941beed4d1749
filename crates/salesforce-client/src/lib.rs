//! Minimal Salesforce REST client for salesforce-sync.
//!
//! Implements [`sync_core::SalesforceApi`] on top of the REST API:
//! username-password OAuth, object describe, and `query`/`queryAll` with
//! pagination. Requests are not retried; a failed call fails the current
//! extraction cycle.

mod client;
pub mod config;

pub use client::SalesforceClient;
pub use config::{
    ConnectionConfig, ConnectionOptions, DEFAULT_API_VERSION, PRODUCTION_LOGIN_URL,
    SANDBOX_LOGIN_URL,
};
