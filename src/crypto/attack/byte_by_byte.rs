use log::{debug, trace};

use crate::config::{alphabet, filler};
use crate::crypto::common::{bytes_to_blocks, round_up_to_nearest_multiple};
use crate::crypto::oracle::{ensure_deterministic, Oracle};
use crate::util::{DecodeExhaustedSnafu, InconsistentOracleSnafu, InvalidArgumentSnafu, Result};

fn block_at(ciphertext: &[u8], block_size: usize, idx: usize) -> Result<Vec<u8>> {
    match bytes_to_blocks(ciphertext, block_size).get(idx) {
        Some(block) => Ok(block.to_vec()),
        None => InconsistentOracleSnafu {
            reason: format!("{} byte output has no block {}", ciphertext.len(), idx),
        }
        .fail(),
    }
}

// Also works against CBC, CFB and keystream oracles with a fixed IV
pub fn decode_suffix(
    oracle: &dyn Oracle,
    suffix_len: usize,
    prefix_len: usize,
    block_size: usize,
    allowed_bytes: &[u8],
) -> Result<Vec<u8>> {
    if block_size == 0 {
        return InvalidArgumentSnafu { reason: "block size must be positive" }.fail();
    }
    let candidates = alphabet(allowed_bytes);
    let fill = filler(allowed_bytes);

    let prefix_fill = round_up_to_nearest_multiple(prefix_len + 1, block_size) - prefix_len;
    let window_blocks = suffix_len / block_size + 1;
    let mut window = vec![fill; prefix_fill + window_blocks * block_size];
    let target_idx = (prefix_len + prefix_fill) / block_size + window_blocks - 1;
    ensure_deterministic(oracle, &window)?;
    debug!(
        "decoding {} suffix bytes through block {} using {} candidates",
        suffix_len,
        target_idx,
        candidates.len()
    );

    let mut recovered: Vec<u8> = Vec::with_capacity(suffix_len);
    for position in 0..suffix_len {
        window.remove(0);
        let target = block_at(&oracle(&window)?, block_size, target_idx)?;

        let mut guess = [window.as_slice(), recovered.as_slice(), &[0u8][..]].concat();
        let last = guess.len() - 1;
        let mut found = None;
        for &candidate in &candidates {
            guess[last] = candidate;
            if block_at(&oracle(&guess)?, block_size, target_idx)? == target {
                found = Some(candidate);
                break;
            }
        }

        match found {
            Some(byte) => {
                trace!("suffix byte {} is {:02x}", position, byte);
                recovered.push(byte);
            }
            None => return DecodeExhaustedSnafu { position, recovered }.fail(),
        }
    }
    debug!("recovered suffix {}", hex::encode(&recovered));
    Ok(recovered)
}

#[cfg(test)]
use base64::{Engine as _, engine::general_purpose};
#[cfg(test)]
use crate::crypto::mode::CipherMode;
#[cfg(test)]
use crate::crypto::oracle::{get_id_oracle, IvSource};
#[cfg(test)]
use crate::util::Error;

#[test]
fn test_decode_target123() {
    let oracle = get_id_oracle()
        .pullback_add_left_padding(b"AAAAAA")
        .pullback_add_right_padding(b"target123")
        .pushforward_pkcs_7(16)
        .pushforward_ecb_encrypt_fixed_key();
    assert_eq!(b"target123".to_vec(), decode_suffix(&oracle, 9, 6, 16, &[]).unwrap());

    let printable: Vec<u8> = (b' '..=b'~').collect();
    assert_eq!(b"target123".to_vec(), decode_suffix(&oracle, 9, 6, 16, &printable).unwrap());
}

#[test]
fn test_decode_suffix_behind_random_prefix() {
    let unknown_string = b"Um9sbGluJyBpbiBteSA1LjAKV2l0aCBteSByYWctdG9wIGRvd24gc28gbXkgaGFpciBjYW4gYmxvdwpUaGUgZ2lybGllcyBvbiBzdGFuZGJ5IHdhdmluZyBqdXN0IHRvIHNheSBoaQpEaWQgeW91IHN0b3A/IE5vLCBJIGp1c3QgZHJvdmUgYnkK";
    let unknown = general_purpose::STANDARD
        .decode(unknown_string)
        .expect("Base64 decoding failed");
    let expected = b"Rollin' in my 5.0\nWith my rag-top down so my hair can blow\nThe girlies on standby waving just to say hi\nDid you stop? No, I just drove by\n".to_vec();

    for prefix_len in [0, 5, 16, 37] {
        let oracle = get_id_oracle()
            .pullback_add_left_padding(&vec![b'#'; prefix_len])
            .pullback_add_right_padding(&unknown)
            .pushforward_pkcs_7(16)
            .pushforward_ecb_encrypt_fixed_key();
        let result = decode_suffix(&oracle, unknown.len(), prefix_len, 16, &[]).unwrap();
        assert_eq!(expected, result);
    }
}

#[test]
fn test_decode_suffix_fixed_iv_cbc() {
    let oracle = get_id_oracle()
        .pullback_add_left_padding(b"abc")
        .pullback_add_right_padding(b"chained secret")
        .pushforward_pkcs_7(16)
        .pushforward_encrypt_fixed_key(CipherMode::Cbc, IvSource::random_fixed(16));
    // The IV is one block of prefix as far as the oracle's output goes
    assert_eq!(b"chained secret".to_vec(), decode_suffix(&oracle, 14, 19, 16, &[]).unwrap());
}

#[test]
fn test_decode_suffix_outside_alphabet() {
    let oracle = get_id_oracle()
        .pullback_add_right_padding(b"abc!def")
        .pushforward_pkcs_7(16)
        .pushforward_ecb_encrypt_fixed_key();
    let letters: Vec<u8> = (b'a'..=b'z').collect();
    match decode_suffix(&oracle, 7, 0, 16, &letters) {
        Err(Error::DecodeExhausted { position, recovered }) => {
            assert_eq!(3, position);
            assert_eq!(b"abc".to_vec(), recovered);
        }
        other => panic!("expected DecodeExhausted, got {:?}", other),
    }
}

#[test]
fn test_decode_suffix_randomized_oracle() {
    let oracle = get_id_oracle()
        .pullback_add_right_padding(b"secret")
        .pushforward_pkcs_7(16)
        .pushforward_encrypt_fixed_key(CipherMode::Cbc, IvSource::Random);
    assert!(matches!(
        decode_suffix(&oracle, 6, 16, 16, &[]),
        Err(Error::RandomizedOracle { .. })
    ));
}
