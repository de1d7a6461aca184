//! Advisory length and hash checks run between decode and store.
//!
//! Both checks only report; the caller logs the outcome and stores the file
//! regardless.

use sha2::{Digest, Sha256};

/// Digest algorithm, inferred from the length of the expected hex digest
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// 32 hex chars
    Md5,
    /// 64 hex chars
    Sha256,
}

impl DigestAlgorithm {
    /// Pick the algorithm producing digests of this hex length
    pub fn for_hex(digest: &str) -> Option<Self> {
        match digest.len() {
            32 => Some(DigestAlgorithm::Md5),
            64 => Some(DigestAlgorithm::Sha256),
            _ => None,
        }
    }

    /// Lowercase hex digest of `bytes`
    pub fn hex_digest(&self, bytes: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 => format!("{:x}", md5::compute(bytes)),
            DigestAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(bytes);
                format!("{:x}", hasher.finalize())
            }
        }
    }
}

/// Whether the digest of `bytes` equals `expected` (hex, case-insensitive)
///
/// Digests of unsupported length never match.
pub fn matches(bytes: &[u8], expected: &str) -> bool {
    let expected = expected.trim();
    match DigestAlgorithm::for_hex(expected) {
        Some(algorithm) => algorithm.hex_digest(bytes).eq_ignore_ascii_case(expected),
        None => false,
    }
}

/// Outcome of [`length_check`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthCheck {
    /// Lengths agree
    Match,
    /// Lengths differ
    Mismatch {
        /// Declared, or reported when undeclared
        expected: u64,
        /// Decoded length
        actual: u64,
    },
    /// Neither the catalog nor the transfer layer supplied a length
    Unknown,
}

/// Compare the decoded length with the declared length, falling back to the
/// length the transfer layer reported when the catalog declares none
pub fn length_check(actual: u64, declared: Option<u64>, reported: Option<u64>) -> LengthCheck {
    match declared.or(reported) {
        Some(expected) if expected == actual => LengthCheck::Match,
        Some(expected) => LengthCheck::Mismatch { expected, actual },
        None => LengthCheck::Unknown,
    }
}

/// Outcome of [`hash_check`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashCheck {
    /// Digest matches
    Match,
    /// Descriptor has no expected digest
    Missing,
    /// Digest differs
    Mismatch,
}

/// Compare the decoded payload with the expected digest
pub fn hash_check(bytes: &[u8], expected: Option<&str>) -> HashCheck {
    match expected {
        None => HashCheck::Missing,
        Some(digest) if matches(bytes, digest) => HashCheck::Match,
        Some(_) => HashCheck::Mismatch,
    }
}
