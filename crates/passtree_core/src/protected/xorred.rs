//! One-time-pad storage for protected values.

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Bytes held as `data XOR pad`, with the pad in a separate allocation.
///
/// Neither allocation ever contains the plaintext. Both are wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct XorredBuffer {
    masked: Vec<u8>,
    pad: Vec<u8>,
}

impl XorredBuffer {
    /// Masks `plain` with a fresh random pad.
    pub(crate) fn new(plain: &[u8]) -> Self {
        let mut pad = vec![0u8; plain.len()];
        rand::thread_rng().fill_bytes(&mut pad);

        let masked = plain.iter().zip(&pad).map(|(p, k)| p ^ k).collect();
        Self { masked, pad }
    }

    /// Returns the number of protected bytes.
    pub(crate) fn len(&self) -> usize {
        self.masked.len()
    }

    /// Unmasks into a buffer that is wiped when dropped.
    pub(crate) fn plaintext(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(
            self.masked
                .iter()
                .zip(&self.pad)
                .map(|(m, k)| m ^ k)
                .collect(),
        )
    }
}

impl std::fmt::Debug for XorredBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XorredBuffer")
            .field("len", &self.masked.len())
            .field("data", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_bytes_differ_from_plaintext() {
        let plain = vec![0x41u8; 64];
        let buf = XorredBuffer::new(&plain);
        assert_ne!(buf.masked, plain);
        assert_eq!(buf.plaintext().as_slice(), plain.as_slice());
    }

    #[test]
    fn empty_buffer() {
        let buf = XorredBuffer::new(&[]);
        assert_eq!(buf.len(), 0);
        assert!(buf.plaintext().is_empty());
    }
}
