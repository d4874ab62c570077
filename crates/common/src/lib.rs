//! Common types for the WHOOP terminal client

mod secret;

pub use secret::Secret;
