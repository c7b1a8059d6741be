//! # warden-core
//!
//! Core types, the transport trait, configuration, and error handling for Warden.

pub mod config;
pub mod error;
pub mod message;
pub mod traits;

pub use config::shellexpand;
