//! Structure discovery for `prefix || input || suffix` oracles. A constant
//! IV in front of the ciphertext is reported as one more block of prefix.

use itertools::Itertools;
use log::{debug, trace};

use crate::config::{distinct_pair, filler, AttackConfig};
use crate::crypto::common::{count_differing_bytes, first_differing_block, repeating_block};
use crate::crypto::mode::CipherMode;
use crate::crypto::oracle::{ensure_deterministic, Oracle};
use crate::util::{
    gcd_of, InconsistentOracleSnafu, InvalidArgumentSnafu, NoSizeChangeObservedSnafu, Result,
    UnsupportedModeSnafu,
};

/// Structure of an oracle as recovered by [`probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub block_size: usize,
    pub mode: CipherMode,
    pub prefix_len: usize,
    pub suffix_len: usize,
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 {
        return InvalidArgumentSnafu { reason: "block size must be positive" }.fail();
    }
    Ok(())
}

// gcd of the jumps in ciphertext length as the canary grows
pub fn get_block_size(oracle: &dyn Oracle, max_probe_len: usize, allowed_bytes: &[u8]) -> Result<usize> {
    if max_probe_len < 1 {
        return InvalidArgumentSnafu { reason: "max_probe_len must be at least 1" }.fail();
    }
    let canary = filler(allowed_bytes);
    let lengths: Vec<usize> = (0..=max_probe_len)
        .map(|n| oracle(&vec![canary; n]).map(|c| c.len()))
        .collect::<Result<Vec<usize>>>()?
        .into_iter()
        .unique()
        .collect();
    trace!("distinct ciphertext lengths: {:?}", lengths);

    let min = match lengths.iter().min() {
        Some(&min) if lengths.len() > 1 => min,
        _ => return NoSizeChangeObservedSnafu { max_probe_len }.fail(),
    };
    let block_size = gcd_of(lengths.iter().map(|len| len - min));
    debug!("block size is {}", block_size);
    Ok(block_size)
}

// Four blocks minus two bytes always contains two whole aligned copies of
// the filler block, whatever the prefix length
pub fn uses_ecb(oracle: &dyn Oracle, block_size: usize, allowed_bytes: &[u8]) -> Result<bool> {
    check_block_size(block_size)?;
    let message = vec![filler(allowed_bytes); 4 * block_size - 2];
    let ciphertext = oracle(&message)?;
    Ok(repeating_block(&ciphertext, block_size).is_some())
}

// Largest count of changed ciphertext bytes over every single-byte change
// in an aligned block: 1 for a keystream, whole blocks for CBC, whole blocks
// plus one for CFB
pub fn diagnose_mode(
    oracle: &dyn Oracle,
    block_size: usize,
    prefix_len: usize,
    allowed_bytes: &[u8],
) -> Result<CipherMode> {
    check_block_size(block_size)?;
    let (c, d) = distinct_pair(allowed_bytes)?;
    ensure_deterministic(oracle, &vec![c; block_size])?;

    if uses_ecb(oracle, block_size, allowed_bytes)? {
        debug!("repeated ciphertext block found, mode is ECB");
        return Ok(CipherMode::Ecb);
    }

    let fill = (block_size - prefix_len % block_size) % block_size;
    let baseline_message = vec![c; fill + block_size];
    let baseline = oracle(&baseline_message)?;

    let mut max_diff = 0;
    for offset in 0..block_size {
        let mut message = baseline_message.clone();
        message[fill + offset] = d;
        let ciphertext = oracle(&message)?;
        if ciphertext.len() != baseline.len() {
            return InconsistentOracleSnafu {
                reason: format!(
                    "same-length inputs gave {} and {} byte outputs",
                    baseline.len(),
                    ciphertext.len()
                ),
            }
            .fail();
        }
        let diff = count_differing_bytes(&baseline, &ciphertext);
        trace!("offset {}: {} ciphertext bytes changed", offset, diff);
        max_diff = max_diff.max(diff);
    }

    let mode = match max_diff {
        0 => {
            return InconsistentOracleSnafu {
                reason: "changing an input byte never changed the output",
            }
            .fail()
        }
        1 => CipherMode::Stream,
        n if n % block_size == 0 => CipherMode::Cbc,
        n if n % block_size == 1 => CipherMode::Cfb,
        n => return UnsupportedModeSnafu { diff_count: n, block_size }.fail(),
    };
    debug!("{} ciphertext bytes changed at most, mode is {}", max_diff, mode);
    Ok(mode)
}

// Returns (prefix_len, suffix_len). Assumes PKCS#7 padding.
pub fn get_additional_message_len(
    oracle: &dyn Oracle,
    block_size: usize,
    allowed_bytes: &[u8],
) -> Result<(usize, usize)> {
    check_block_size(block_size)?;
    let (a, b) = distinct_pair(allowed_bytes)?;
    ensure_deterministic(oracle, &[a])?;

    let mut lengths = Vec::with_capacity(block_size);
    let mut first_diffs = Vec::with_capacity(block_size);
    for i in 0..block_size {
        let mut message = vec![a; i + 1];
        let first = oracle(&message)?;
        message[i] = b;
        let second = oracle(&message)?;
        let first_diff = match first_differing_block(&first, &second, block_size) {
            Some(idx) => idx,
            None => {
                return InconsistentOracleSnafu {
                    reason: format!("messages differing in byte {} encrypted identically", i),
                }
                .fail()
            }
        };
        trace!("alignment {}: {} bytes out, first difference in block {}", i, first.len(), first_diff);
        lengths.push(first.len());
        first_diffs.push(first_diff);
    }

    let same_len = lengths.iter().filter(|&&len| len == lengths[0]).count();
    let same_diff = first_diffs.iter().filter(|&&idx| idx == first_diffs[0]).count();
    // One byte of attacker input was always present
    let total = match lengths[0].checked_sub(same_len + 1) {
        Some(total) => total,
        None => {
            return InconsistentOracleSnafu {
                reason: format!("{} byte output is too short for padded input", lengths[0]),
            }
            .fail()
        }
    };
    let prefix_len = first_diffs[0] * block_size + (block_size - same_diff);
    let suffix_len = match total.checked_sub(prefix_len) {
        Some(suffix_len) => suffix_len,
        None => {
            return InconsistentOracleSnafu {
                reason: format!("prefix of {} bytes exceeds {} added bytes", prefix_len, total),
            }
            .fail()
        }
    };
    debug!("prefix is {} bytes, suffix is {} bytes", prefix_len, suffix_len);
    Ok((prefix_len, suffix_len))
}

pub fn probe(oracle: &dyn Oracle, config: &AttackConfig) -> Result<ProbeResult> {
    let block_size = get_block_size(oracle, config.max_probe_len, &config.allowed_bytes)?;
    let (prefix_len, suffix_len) = get_additional_message_len(oracle, block_size, &config.allowed_bytes)?;
    let mode = diagnose_mode(oracle, block_size, prefix_len, &config.allowed_bytes)?;
    let result = ProbeResult { block_size, mode, prefix_len, suffix_len };
    debug!("probe finished: {:?}", result);
    Ok(result)
}

#[cfg(test)]
use crate::crypto::oracle::{choose_random, get_id_oracle, IvSource};
#[cfg(test)]
use crate::util::Error;

#[test]
fn test_get_block_size() {
    let oracle = get_id_oracle()
        .pullback_add_random_left_padding::<0, 40>()
        .pullback_add_random_right_padding::<0, 40>()
        .pushforward_pkcs_7(16)
        .pushforward_ecb_encrypt_fixed_key();
    assert_eq!(16, get_block_size(&oracle, 32, &[]).unwrap());
    assert_eq!(16, get_block_size(&oracle, 17, b"Z").unwrap());
}

#[test]
fn test_get_block_size_failures() {
    let oracle = get_id_oracle()
        .pushforward_pkcs_7(16)
        .pushforward_ecb_encrypt_fixed_key();
    assert!(matches!(
        get_block_size(&oracle, 0, &[]),
        Err(Error::InvalidArgument { .. })
    ));

    let constant = |_: &[u8]| -> Result<Vec<u8>> { Ok(vec![0; 32]) };
    assert!(matches!(
        get_block_size(&constant, 32, &[]),
        Err(Error::NoSizeChangeObserved { max_probe_len: 32 })
    ));
}

#[test]
fn test_target123() {
    let oracle = get_id_oracle()
        .pullback_add_left_padding(b"AAAAAA")
        .pullback_add_right_padding(b"target123")
        .pushforward_pkcs_7(16)
        .pushforward_ecb_encrypt_fixed_key();
    let result = probe(&oracle, &AttackConfig::default()).unwrap();
    assert_eq!(
        ProbeResult { block_size: 16, mode: CipherMode::Ecb, prefix_len: 6, suffix_len: 9 },
        result
    );
    assert!(uses_ecb(&oracle, 16, &[]).unwrap());
}

#[test]
fn test_get_additional_message_len_aligned() {
    for (prefix, suffix) in [(0, 0), (16, 16), (15, 17), (32, 1)] {
        let oracle = get_id_oracle()
            .pullback_add_left_padding(&vec![b'p'; prefix])
            .pullback_add_right_padding(&vec![b's'; suffix])
            .pushforward_pkcs_7(16)
            .pushforward_ecb_encrypt_fixed_key();
        assert_eq!((prefix, suffix), get_additional_message_len(&oracle, 16, &[]).unwrap());
    }
}

#[test]
fn test_iv_counts_as_prefix() {
    let oracle = get_id_oracle()
        .pullback_add_left_padding(b"0123")
        .pullback_add_right_padding(b"tail")
        .pushforward_pkcs_7(16)
        .pushforward_encrypt_fixed_key(CipherMode::Cbc, IvSource::random_fixed(16));
    assert_eq!((20, 4), get_additional_message_len(&oracle, 16, &[]).unwrap());
}

#[test]
fn test_diagnose_mode_every_mode() {
    for mode in [CipherMode::Ecb, CipherMode::Cbc, CipherMode::Cfb, CipherMode::Stream] {
        let oracle = get_id_oracle()
            .pullback_add_random_left_padding::<0, 40>()
            .pullback_add_random_right_padding::<0, 40>()
            .pushforward_pkcs_7(16)
            .pushforward_encrypt_fixed_key(mode, IvSource::random_fixed(16));
        let result = probe(&oracle, &AttackConfig::default()).unwrap();
        assert_eq!(mode, result.mode);
    }
}

#[test]
fn test_diagnose_mode_ctr() {
    let oracle = get_id_oracle()
        .pullback_add_left_padding(b"prefix")
        .pushforward_pkcs_7(16)
        .pushforward_ctr_encrypt_fixed_key(0);
    assert_eq!(CipherMode::Stream, diagnose_mode(&oracle, 16, 6, &[]).unwrap());
}

#[test]
fn test_diagnose_blind_ecb_or_cbc() {
    for _ in 0..10 {
        let ecb = get_id_oracle()
            .pullback_add_random_left_padding::<5, 10>()
            .pullback_add_random_right_padding::<5, 10>()
            .pushforward_pkcs_7(16)
            .pushforward_encrypt_fixed_key(CipherMode::Ecb, IvSource::Random);
        let cbc = get_id_oracle()
            .pullback_add_random_left_padding::<5, 10>()
            .pullback_add_random_right_padding::<5, 10>()
            .pushforward_pkcs_7(16)
            .pushforward_encrypt_fixed_key(CipherMode::Cbc, IvSource::random_fixed(16));
        let (is_ecb, oracle) = choose_random(ecb, cbc);
        assert_eq!(is_ecb, uses_ecb(&oracle, 16, &[]).unwrap());
    }
}

#[test]
fn test_randomized_oracle_is_rejected() {
    let oracle = get_id_oracle()
        .pushforward_pkcs_7(16)
        .pushforward_encrypt_fixed_key(CipherMode::Cbc, IvSource::Random);
    assert!(matches!(
        get_additional_message_len(&oracle, 16, &[]),
        Err(Error::RandomizedOracle { .. })
    ));
    assert!(matches!(
        diagnose_mode(&oracle, 16, 16, &[]),
        Err(Error::RandomizedOracle { .. })
    ));
}

#[test]
fn test_restricted_alphabet() {
    let oracle = get_id_oracle()
        .pullback_add_left_padding(b"AAAAAA")
        .pullback_add_right_padding(b"target123")
        .pushforward_pkcs_7(16)
        .pushforward_ecb_encrypt_fixed_key();
    let config = AttackConfig::default().with_allowed_bytes(b"xy");
    assert_eq!(6, probe(&oracle, &config).unwrap().prefix_len);

    let config = AttackConfig::default().with_allowed_bytes(b"xx");
    assert!(matches!(
        probe(&oracle, &config),
        Err(Error::InvalidArgument { .. })
    ));
}

#[test]
fn test_constant_oracle_is_inconsistent() {
    let constant = |_: &[u8]| -> Result<Vec<u8>> { Ok(vec![7; 32]) };
    assert!(matches!(
        get_additional_message_len(&constant, 16, &[]),
        Err(Error::InconsistentOracle { .. })
    ));
}

#[test]
fn test_diagnose_mode_ignored_input() {
    // Distinct blocks, so the ECB check stays quiet
    let ignoring = |_: &[u8]| -> Result<Vec<u8>> { Ok((0..48).collect()) };
    assert!(matches!(
        diagnose_mode(&ignoring, 16, 0, &[]),
        Err(Error::InconsistentOracle { .. })
    ));
}

#[test]
fn test_diagnose_mode_length_depends_on_content() {
    let growing = |buf: &[u8]| -> Result<Vec<u8>> {
        let extra = buf.iter().filter(|&&b| b == b'b').count();
        Ok((0..(48 + extra) as u8).collect())
    };
    assert!(matches!(
        diagnose_mode(&growing, 16, 0, &[]),
        Err(Error::InconsistentOracle { .. })
    ));
}

#[test]
fn test_diagnose_mode_unsupported() {
    // Every input byte lands on two neighbouring output bytes
    let smear = |buf: &[u8]| -> Result<Vec<u8>> {
        let mut out: Vec<u8> = (0..64).collect();
        for (j, &b) in buf.iter().enumerate() {
            out[j] ^= b;
            out[j + 1] ^= b;
        }
        Ok(out)
    };
    assert!(matches!(
        diagnose_mode(&smear, 16, 0, &[]),
        Err(Error::UnsupportedMode { diff_count: 2, block_size: 16 })
    ));
}
