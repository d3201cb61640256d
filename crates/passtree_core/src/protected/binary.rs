//! Immutable, optionally memory-protected byte value.

use super::xorred::XorredBuffer;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::{Zeroize, Zeroizing};

enum Storage {
    Plain(Zeroizing<Vec<u8>>),
    Protected(XorredBuffer),
}

/// Immutable byte value that may be held masked in memory.
///
/// Clones share the underlying storage. Reading always yields a
/// [`Zeroizing`] buffer; the storage mode chosen at construction never
/// changes.
#[derive(Clone)]
pub struct ProtectedBinary {
    protected: bool,
    storage: Arc<Storage>,
}

impl ProtectedBinary {
    /// Creates a value from plaintext bytes.
    #[must_use]
    pub fn new(protect: bool, data: &[u8]) -> Self {
        let storage = if protect {
            Storage::Protected(XorredBuffer::new(data))
        } else {
            Storage::Plain(Zeroizing::new(data.to_vec()))
        };
        Self {
            protected: protect,
            storage: Arc::new(storage),
        }
    }

    /// Creates a value from an owned buffer.
    ///
    /// When protecting, the input buffer is wiped after masking.
    #[must_use]
    pub fn from_vec(protect: bool, mut data: Vec<u8>) -> Self {
        if protect {
            let value = Self::new(true, &data);
            data.zeroize();
            value
        } else {
            Self {
                protected: false,
                storage: Arc::new(Storage::Plain(Zeroizing::new(data))),
            }
        }
    }

    /// Creates an empty, unprotected value.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(false, &[])
    }

    /// Returns `true` if the value is held masked in memory.
    #[inline]
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.storage.as_ref() {
            Storage::Plain(data) => data.len(),
            Storage::Protected(buf) => buf.len(),
        }
    }

    /// Returns `true` if the value holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the plaintext into a buffer that is wiped when dropped.
    #[must_use]
    pub fn read_data(&self) -> Zeroizing<Vec<u8>> {
        match self.storage.as_ref() {
            Storage::Plain(data) => Zeroizing::new(data.to_vec()),
            Storage::Protected(buf) => buf.plaintext(),
        }
    }

    /// Returns the same bytes under a different protection mode.
    #[must_use]
    pub fn with_protection(&self, protect: bool) -> Self {
        if protect == self.protected {
            return self.clone();
        }
        Self::new(protect, &self.read_data())
    }

    /// Compares the stored bytes, optionally requiring equal protection.
    #[must_use]
    pub fn equals(&self, other: &Self, check_protection: bool) -> bool {
        if check_protection && self.protected != other.protected {
            return false;
        }
        if Arc::ptr_eq(&self.storage, &other.storage) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        *self.read_data() == *other.read_data()
    }
}

impl Default for ProtectedBinary {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for ProtectedBinary {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, true)
    }
}

impl Eq for ProtectedBinary {}

impl std::fmt::Debug for ProtectedBinary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ProtectedBinary");
        s.field("protected", &self.protected).field("len", &self.len());
        if self.protected {
            s.field("data", &"[REDACTED]");
        }
        s.finish()
    }
}

#[derive(Serialize)]
struct BinaryReprRef<'a> {
    protected: bool,
    data: &'a [u8],
}

#[derive(Deserialize)]
struct BinaryRepr {
    protected: bool,
    data: Vec<u8>,
}

impl Serialize for ProtectedBinary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.read_data();
        BinaryReprRef {
            protected: self.protected,
            data: &data,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProtectedBinary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = BinaryRepr::deserialize(deserializer)?;
        Ok(Self::from_vec(repr.protected, repr.data))
    }
}
