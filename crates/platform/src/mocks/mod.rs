//! Mock implementations for testing
//!
//! This module provides mock implementations of the jack traits for use in
//! unit and integration tests, here and in downstream crates.

#![cfg(any(test, feature = "std"))]

mod jack;

pub use jack::*;
