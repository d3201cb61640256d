//! Immutable, optionally memory-protected UTF-8 string.

use super::binary::ProtectedBinary;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Add;
use zeroize::Zeroizing;

/// Immutable string value that may be held masked in memory.
///
/// Every operation that looks like editing returns a new value. Any
/// plaintext scratch buffer an operation allocates is wiped before it
/// returns; buffers handed to the caller are [`Zeroizing`].
#[derive(Clone, Default)]
pub struct ProtectedString {
    bytes: ProtectedBinary,
    chars: usize,
}

impl ProtectedString {
    /// Creates a value from a plaintext string.
    #[must_use]
    pub fn new(protect: bool, value: &str) -> Self {
        Self {
            bytes: ProtectedBinary::new(protect, value.as_bytes()),
            chars: value.chars().count(),
        }
    }

    /// Creates a value from UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `utf8` is not valid UTF-8.
    pub fn from_utf8(protect: bool, utf8: &[u8]) -> CoreResult<Self> {
        let value = std::str::from_utf8(utf8)
            .map_err(|e| CoreError::invalid_argument(format!("invalid UTF-8: {e}")))?;
        Ok(Self::new(protect, value))
    }

    /// Creates an empty, unprotected value.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if the value is held masked in memory.
    #[inline]
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.bytes.is_protected()
    }

    /// Returns the length in characters.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars
    }

    /// Returns `true` for the empty string.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    /// Reads the plaintext string.
    #[must_use]
    pub fn read_string(&self) -> Zeroizing<String> {
        let utf8 = self.bytes.read_data();
        Zeroizing::new(String::from_utf8_lossy(&utf8).into_owned())
    }

    /// Reads the plaintext as UTF-8 bytes.
    #[must_use]
    pub fn read_utf8(&self) -> Zeroizing<Vec<u8>> {
        self.bytes.read_data()
    }

    /// Returns the same text under a different protection mode.
    #[must_use]
    pub fn with_protection(&self, protect: bool) -> Self {
        Self {
            bytes: self.bytes.with_protection(protect),
            chars: self.chars,
        }
    }

    /// Compares the text, optionally requiring equal protection.
    #[must_use]
    pub fn equals(&self, other: &Self, check_protection: bool) -> bool {
        self.chars == other.chars && self.bytes.equals(&other.bytes, check_protection)
    }

    /// Appends `other`; the result is protected if either operand is.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        if other.is_empty() && !other.is_protected() {
            return self.clone();
        }
        let mut joined = Zeroizing::new(String::with_capacity(
            self.bytes.len() + other.bytes.len(),
        ));
        joined.push_str(&self.read_string());
        joined.push_str(&other.read_string());
        Self::new(self.is_protected() || other.is_protected(), &joined)
    }

    /// Removes leading and trailing whitespace.
    #[must_use]
    pub fn trim(&self) -> Self {
        let value = self.read_string();
        let trimmed = value.trim();
        if trimmed.len() == value.len() {
            return self.clone();
        }
        Self::new(self.is_protected(), trimmed)
    }

    /// Inserts `text` before the character at `char_index`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `char_index` is past the end.
    pub fn insert(&self, char_index: usize, text: &str) -> CoreResult<Self> {
        if char_index > self.chars {
            return Err(CoreError::invalid_argument(format!(
                "insert position {char_index} beyond length {}",
                self.chars
            )));
        }
        if text.is_empty() {
            return Ok(self.clone());
        }

        let value = self.read_string();
        let at = byte_offset(&value, char_index);
        let mut edited = Zeroizing::new(String::with_capacity(value.len() + text.len()));
        edited.push_str(&value[..at]);
        edited.push_str(text);
        edited.push_str(&value[at..]);
        Ok(Self::new(self.is_protected(), &edited))
    }

    /// Removes `count` characters starting at `char_index`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the range is not inside the string.
    pub fn remove(&self, char_index: usize, count: usize) -> CoreResult<Self> {
        let end = char_index.checked_add(count).filter(|end| *end <= self.chars);
        let Some(end) = end else {
            return Err(CoreError::invalid_argument(format!(
                "remove range {char_index}+{count} beyond length {}",
                self.chars
            )));
        };
        if count == 0 {
            return Ok(self.clone());
        }

        let value = self.read_string();
        let from = byte_offset(&value, char_index);
        let to = byte_offset(&value, end);
        let mut edited = Zeroizing::new(String::with_capacity(value.len() - (to - from)));
        edited.push_str(&value[..from]);
        edited.push_str(&value[to..]);
        Ok(Self::new(self.is_protected(), &edited))
    }
}

fn byte_offset(value: &str, char_index: usize) -> usize {
    value
        .char_indices()
        .nth(char_index)
        .map_or(value.len(), |(i, _)| i)
}

impl Add<&ProtectedString> for &ProtectedString {
    type Output = ProtectedString;

    fn add(self, rhs: &ProtectedString) -> ProtectedString {
        self.concat(rhs)
    }
}

impl PartialEq for ProtectedString {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, true)
    }
}

impl Eq for ProtectedString {}

impl std::fmt::Debug for ProtectedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_protected() {
            f.debug_struct("ProtectedString")
                .field("len", &self.chars)
                .field("value", &"[REDACTED]")
                .finish()
        } else {
            f.debug_tuple("ProtectedString")
                .field(&self.read_string().as_str())
                .finish()
        }
    }
}

impl Serialize for ProtectedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bytes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProtectedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = ProtectedBinary::deserialize(deserializer)?;
        let chars = std::str::from_utf8(&bytes.read_data())
            .map_err(serde::de::Error::custom)?
            .chars()
            .count();
        Ok(Self { bytes, chars })
    }
}
