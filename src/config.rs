//! Knobs shared by the probing and recovery routines.

use itertools::Itertools;

use crate::util::{InvalidArgumentSnafu, Result};

const DEFAULT_FILLER: u8 = b'a';
const DEFAULT_PAIR: (u8, u8) = (b'a', b'b');

/// Settings for a full probe-then-exploit run against an encryption oracle.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Longest canary sent while looking for a change in ciphertext length.
    ///
    /// Default: 32.
    pub max_probe_len: usize,

    /// Bytes the oracle accepts unaltered. Empty means every byte is safe.
    ///
    /// Default: empty.
    pub allowed_bytes: Vec<u8>,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            max_probe_len: 32,
            allowed_bytes: Vec::new(),
        }
    }
}

impl AttackConfig {
    pub fn with_max_probe_len(mut self, max_probe_len: usize) -> Self {
        self.max_probe_len = max_probe_len;
        self
    }

    pub fn with_allowed_bytes(mut self, allowed_bytes: &[u8]) -> Self {
        self.allowed_bytes = allowed_bytes.to_vec();
        self
    }

    pub fn alphabet(&self) -> Vec<u8> {
        alphabet(&self.allowed_bytes)
    }
}

// Deduplicated in first-seen order, so candidate search order follows the caller's list
pub fn alphabet(allowed_bytes: &[u8]) -> Vec<u8> {
    if allowed_bytes.is_empty() {
        return (0..=u8::MAX).collect();
    }
    allowed_bytes.iter().copied().unique().collect()
}

pub fn filler(allowed_bytes: &[u8]) -> u8 {
    allowed_bytes.first().copied().unwrap_or(DEFAULT_FILLER)
}

pub fn distinct_pair(allowed_bytes: &[u8]) -> Result<(u8, u8)> {
    if allowed_bytes.is_empty() {
        return Ok(DEFAULT_PAIR);
    }
    let candidates = alphabet(allowed_bytes);
    match candidates.as_slice() {
        &[a, b, ..] => Ok((a, b)),
        _ => InvalidArgumentSnafu {
            reason: "allowed bytes must contain at least two distinct values",
        }
        .fail(),
    }
}

#[test]
fn test_alphabet() {
    assert_eq!(256, alphabet(&[]).len());
    assert_eq!(b"cab".to_vec(), alphabet(b"cabba"));
}

#[test]
fn test_distinct_pair() {
    assert_eq!((b'a', b'b'), distinct_pair(&[]).unwrap());
    assert_eq!((b'x', b'y'), distinct_pair(b"xxy").unwrap());
    assert!(matches!(
        distinct_pair(b"zzz"),
        Err(crate::util::Error::InvalidArgument { .. })
    ));
}

#[test]
fn test_attack_config_defaults() {
    let config = AttackConfig::default();
    assert_eq!(32, config.max_probe_len);
    assert_eq!(256, config.alphabet().len());

    let config = config.with_allowed_bytes(b"01").with_max_probe_len(40);
    assert_eq!(40, config.max_probe_len);
    assert_eq!(b'0', filler(&config.allowed_bytes));
}
