use sha2::{Digest, Sha256};

/// SHA-256 digest of a raw pixel buffer, read as a big-endian 256-bit
/// integer. Identical pixel content always yields the same fingerprint;
/// the digest is a determinism source, not a security boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFingerprint([u8; 32]);

impl ContentFingerprint {
    pub fn of_pixels(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Residue of the fingerprint modulo `m`.
    pub fn rem(&self, m: u64) -> u64 {
        debug_assert!(m > 0);
        let m = u128::from(m);
        self.0
            .iter()
            .fold(0u128, |acc, &byte| ((acc << 8) | u128::from(byte)) % m) as u64
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}
