//! Management API for the data-processing platform.
//!
//! Lets operators trigger and inspect processing jobs, browse logs, and
//! watch live status. Three subsystems carry the design weight: a
//! path-matching authorization resolver ([`security`]), a freshness-keyed
//! response cache ([`cache`]) and a lifecycle-managed change broadcaster
//! ([`broadcast`]); the rest is HTTP plumbing around them.

pub mod broadcast;
pub mod broker;
pub mod cache;
pub mod config;
pub mod http;
pub mod jobs;
pub mod observability;
pub mod security;
pub mod storage;

pub use config::ApiConfig;
pub use http::HttpServer;
