//! WHOOP data API client
//!
//! Typed models for the metric collections and the authenticated request
//! dispatcher. The dispatcher attaches the stored bearer token to each
//! request and, on a 401 with a refresh token available, refreshes exactly
//! once and retries exactly once, never more. Everything else is a
//! one-shot request whose failure propagates to the caller.

pub mod client;
pub mod error;
pub mod models;

pub use client::ApiClient;
pub use error::{Error, Result};
pub use models::{Collection, CycleRecord, RecoveryRecord, SleepRecord, UserProfile};
