//! # passtree testkit
//!
//! Test utilities for passtree.
//!
//! This crate provides:
//! - A fixed clock and database fixtures
//! - Replica pairs for merge scenarios
//! - Property-based generators for databases and edit scripts
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use passtree_testkit::prelude::*;
//!
//! #[test]
//! fn replicas_converge() {
//!     let mut pair = ReplicaPair::new(sample_database(ts(0)));
//!     // ... edit pair.local and pair.remote, then merge
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
}

pub use fixtures::*;
pub use generators::*;

/// Routes `tracing` output of the code under test to the test harness.
///
/// The filter comes from `RUST_LOG`; calling this more than once is fine.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
