//! AWS-oriented adapters and handlers for ride matching.
//!
//! This crate owns runtime integration details (Lambda handlers, the
//! DynamoDB document store, SNS push delivery, environment configuration
//! and log setup). Matching rules and record schemas come from
//! `ride_match_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod runtime;
