//! # Integration Tests
//!
//! Full bundle passes through the admission processor with real crypto
//! adapters where the scenario allows it.

pub mod secret_admission;
