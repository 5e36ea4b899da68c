//! # panmeter Common Library
//!
//! Shared code for the panmeter workspace:
//! - Common error type
//! - Configuration file discovery and TOML loading
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
