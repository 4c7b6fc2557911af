//! Cache fingerprints (blake3).
//!
//! A fingerprint is the opaque key a module computes for "the inputs relevant
//! to this cached computation". Equal fingerprints across runs mean the cached
//! value may be reused.

use std::fmt;

/// A 256-bit fingerprint (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fingerprint of a single byte slice.
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(data.as_ref()).as_bytes())
    }

    /// Start combining several inputs into one fingerprint.
    pub fn builder() -> FingerprintBuilder {
        FingerprintBuilder::default()
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 16 hex chars are enough to tell entries apart in logs
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Incremental fingerprint over several length-delimited parts.
///
/// Every part is prefixed with its length so `("ab", "c")` and `("a", "bc")`
/// never collide.
#[derive(Default)]
pub struct FingerprintBuilder {
    hasher: blake3::Hasher,
}

impl FingerprintBuilder {
    pub fn part(mut self, data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref();
        self.hasher.update(&(data.len() as u64).to_le_bytes());
        self.hasher.update(data);
        self
    }

    pub fn fingerprint(mut self, other: Fingerprint) -> Self {
        self.hasher.update(other.as_bytes());
        self
    }

    pub fn finish(self) -> Fingerprint {
        Fingerprint(*self.hasher.finalize().as_bytes())
    }
}
