//! Core types for Tidewater.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod money;
pub mod result;

pub use money::{Money, MoneyError};
pub use result::{OperationResult, Severity};
