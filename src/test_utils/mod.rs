//! Test utilities for integration testing.
//!
//! This module provides:
//! - In-memory repository implementations for mocking persistence
//! - Mock payment provider and identity stubs
//! - A builder for constructing `AppState` with test dependencies

mod app_state_builder;
mod billing_mocks;
mod factories;

pub use app_state_builder::*;
pub use billing_mocks::*;
pub use factories::*;
