//! # passtree bench
//!
//! Shared builders for the criterion benchmarks under `benches/`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
