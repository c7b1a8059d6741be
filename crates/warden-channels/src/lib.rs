//! # warden-channels
//!
//! Messaging transports for Warden.

pub mod whatsapp;
