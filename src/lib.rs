//! # coinpayments - CoinPayments merchant API client
//!
//! A thin client for the CoinPayments HTTP API. Every call builds a parameter
//! set, signs its form encoding with HMAC-SHA512, POSTs it and returns the
//! `result` field of the JSON response. [`NotificationValidator`] checks the
//! signatures on inbound payment notifications.

pub mod client;
pub mod command;
pub mod crypto;
pub mod error;
pub mod notification;
pub mod types;

// Re-exports for convenience
pub use client::CoinPaymentsClient;
pub use command::Command;
pub use crypto::SignedRequest;
pub use error::{CoinPaymentsError, Result};
pub use notification::NotificationValidator;
pub use types::*;

/// Current version of the coinpayments library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
