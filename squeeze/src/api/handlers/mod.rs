//! HTTP request handlers.
//!
//! - [`compress`]: Image upload and JPEG re-encoding
//! - [`root`]: Welcome payload and method fallbacks
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to the JSON failure envelope (or plain
//! text for 405s) with the matching status code.

pub mod compress;
pub mod root;
