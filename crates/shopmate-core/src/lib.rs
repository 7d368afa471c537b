//! Shared configuration, error, and domain types for Shopmate.
//!
//! Every other crate in the workspace depends on this one; it carries no
//! runtime behaviour beyond config loading.

pub mod config;
pub mod error;
pub mod types;

pub use config::ShopmateConfig;
pub use error::{Result, ShopmateError};
pub use types::*;
