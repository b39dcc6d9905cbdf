//! # streamloop common library
//!
//! Shared code for the streamloop crates:
//! - Frame/second conversions keyed on a stream's sample rate
//! - Configuration file resolution and TOML loading
//! - Common error type

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
