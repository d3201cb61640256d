//! Memory-protected values.
//!
//! Secrets are stored XOR-masked with a per-value random pad so that the
//! plaintext never rests in a long-lived allocation. Plaintext is only
//! materialized on explicit reads, into buffers that wipe themselves.

mod binary;
mod string;
mod xorred;

pub use binary::ProtectedBinary;
pub use string::ProtectedString;
