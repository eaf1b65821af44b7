use rand::RngCore;
use std::collections::HashSet;

use crate::util::{Result, InvalidArgumentSnafu, InvalidPaddingSnafu};
#[cfg(test)]
use crate::util::Error;

// The final block is shorter when the buffer is not a multiple of size
pub fn bytes_to_blocks(buf: &[u8], size: usize) -> Vec<&[u8]> {
    buf.chunks(size).collect()
}

#[test]
fn test_bytes_to_blocks() {
    let blocks = bytes_to_blocks(b"abcdefgh", 3);
    assert_eq!(vec![&b"abc"[..], &b"def"[..], &b"gh"[..]], blocks);
    assert!(bytes_to_blocks(b"", 4).is_empty());
}

pub fn repeating_block(arr: &[u8], size: usize) -> Option<(usize, Vec<u8>)> {
    let mut blocks: HashSet<&[u8]> = HashSet::new();
    for (idx, block) in arr.chunks(size).enumerate() {
        if blocks.contains(block) {
            return Some((idx, block.to_vec()));
        }
        blocks.insert(block);
    }
    None
}

#[test]
fn test_repeating_block() {
    let arr = b"aaabbbcccaaa";
    assert_eq!(Some((3, b"aaa".to_vec())), repeating_block(arr, 3));
    assert_eq!(None,                       repeating_block(arr, 4));
}

// Index of the first block at which the two buffers disagree. A length
// mismatch counts as a difference in the first block past the shorter one.
pub fn first_differing_block(buf1: &[u8], buf2: &[u8], size: usize) -> Option<usize> {
    let blocks1 = bytes_to_blocks(buf1, size);
    let blocks2 = bytes_to_blocks(buf2, size);
    blocks1.iter()
        .zip(blocks2.iter())
        .position(|(x, y)| x != y)
        .or_else(|| {
            if blocks1.len() != blocks2.len() {
                Some(blocks1.len().min(blocks2.len()))
            } else {
                None
            }
        })
}

#[test]
fn test_first_differing_block() {
    assert_eq!(Some(1), first_differing_block(b"aaaabbbbcccc", b"aaaabbbxcccc", 4));
    assert_eq!(None,    first_differing_block(b"aaaabbbb",     b"aaaabbbb",     4));
    assert_eq!(Some(2), first_differing_block(b"aaaabbbb",     b"aaaabbbbcc",   4));
}

pub fn count_differing_bytes(buf1: &[u8], buf2: &[u8]) -> usize {
    buf1.iter()
        .zip(buf2.iter())
        .filter(|(x, y)| x != y)
        .count()
}

#[test]
fn test_count_differing_bytes() {
    assert_eq!(0, count_differing_bytes(b"abc", b"abc"));
    assert_eq!(2, count_differing_bytes(b"abcd", b"xbcy"));
}

// Ciphertext-only upper bound on the block size of whatever produced these
pub fn max_block_size(ciphertexts: &[Vec<u8>]) -> usize {
    crate::util::gcd_of(ciphertexts.iter().map(|c| c.len()))
}

#[test]
fn test_max_block_size() {
    assert_eq!(16, max_block_size(&[vec![0; 32], vec![0; 48], vec![0; 80]]));
    assert_eq!(8,  max_block_size(&[vec![0; 24], vec![0; 16]]));
}

pub fn round_up_to_nearest_multiple(n: usize, m: usize) -> usize {
    m*( (n + (m-1)) / m )
}

#[test]
fn test_round_up_to_nearest_multiple() {
    assert_eq!(16, round_up_to_nearest_multiple(1, 16));
    assert_eq!(16, round_up_to_nearest_multiple(16, 16));
    assert_eq!(0,  round_up_to_nearest_multiple(0, 16));
}

fn check_pkcs_7_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 || block_size > u8::MAX as usize {
        return InvalidArgumentSnafu {
            reason: format!("PKCS#7 block size must be in 1..=255, got {}", block_size),
        }
        .fail();
    }
    Ok(())
}

// Always appends between 1 and block_size bytes, so a full block of padding
// follows input that is already aligned
pub fn pad_pkcs_7(buf: &[u8], block_size: usize) -> Vec<u8> {
    let padding_length = block_size - (buf.len() % block_size);
    [buf, &vec![padding_length as u8; padding_length]].concat()
}

#[test]
fn test_pad_pkcs_7() {
    let case = b"YELLOW SUBMARINE";
    let expected = b"YELLOW SUBMARINE\x04\x04\x04\x04".to_vec();
    let result = pad_pkcs_7(case, 20);
    assert_eq!(expected, result);

    let expected_2 = [
        case.to_vec(),
        vec![16; 16],
    ].concat();
    let result_2 = pad_pkcs_7(case, case.len());
    assert_eq!(expected_2, result_2);

    assert_eq!(vec![4u8; 4], pad_pkcs_7(b"", 4));
}

pub fn is_valid_pkcs_7(buf: &[u8]) -> bool {
    match buf.last() {
        Some(&final_byte) if final_byte > 0 && (final_byte as usize) <= buf.len() => buf
            .iter()
            .rev()
            .take(final_byte as usize)
            .all(|&b| b == final_byte),
        _ => false,
    }
}

#[test]
fn test_is_valid_pkcs_7() {
    assert!(is_valid_pkcs_7(b"ICE ICE BABY\x04\x04\x04\x04"));
    assert!(is_valid_pkcs_7(b"ICE ICE BABY\x01"));
    assert!(!is_valid_pkcs_7(b"ICE ICE BABY\x05\x05\x05\x05"));
    assert!(!is_valid_pkcs_7(b"ICE ICE BABY\x01\x02\x03\x04"));
    assert!(!is_valid_pkcs_7(b"ICE ICE BABY\x00"));
    assert!(!is_valid_pkcs_7(b"\x03\x03"));
    assert!(!is_valid_pkcs_7(b""));
}

pub fn strip_pad_pkcs_7(buf: &[u8], block_size: usize) -> Result<Vec<u8>> {
    check_pkcs_7_block_size(block_size)?;
    if buf.is_empty() || buf.len() % block_size != 0 {
        return InvalidArgumentSnafu {
            reason: format!(
                "padded length {} is not a positive multiple of {}",
                buf.len(),
                block_size
            ),
        }
        .fail();
    }
    let padding_len = buf[buf.len() - 1] as usize;
    if padding_len > block_size || !is_valid_pkcs_7(buf) {
        return InvalidPaddingSnafu {}.fail();
    }
    Ok(buf[..buf.len() - padding_len].to_vec())
}

#[test]
fn test_strip_pad_pkcs_7() {
    let case = b"YELLOW SUBMARINE\x04\x04\x04\x04";
    let expected = b"YELLOW SUBMARINE".to_vec();
    let result = strip_pad_pkcs_7(case, 20);
    assert_eq!(expected, result.unwrap());

    let result_2 = strip_pad_pkcs_7(case, 16);
    assert!(matches!(result_2, Err(Error::InvalidArgument { .. })));

    let case_3 = [&b"YELLOW SUBMARINE"[..], &[16u8; 16][..]].concat();
    let result_3 = strip_pad_pkcs_7(&case_3, 16);
    assert_eq!(expected, result_3.unwrap());

    let case_4 = b"ICE ICE BABY\x04\x04\x04\x04";
    let expected_4 = b"ICE ICE BABY".to_vec();
    let result_4 = strip_pad_pkcs_7(case_4, case_4.len());
    assert_eq!(expected_4, result_4.unwrap());

    let case_5 = b"ICE ICE BABY\x05\x05\x05\x05";
    let result_5 = strip_pad_pkcs_7(case_5, case_5.len());
    assert!(matches!(result_5, Err(Error::InvalidPadding {})));

    let case_6 = b"ICE ICE BABY\x01\x02\x03\x04";
    let result_6 = strip_pad_pkcs_7(case_6, case_6.len());
    assert!(matches!(result_6, Err(Error::InvalidPadding {})));
}

#[test]
fn test_pad_then_strip_is_identity() {
    for len in 0..=40 {
        let message: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
        let padded = pad_pkcs_7(&message, 16);
        assert_eq!(0, padded.len() % 16);
        assert_eq!(message, strip_pad_pkcs_7(&padded, 16).unwrap());
    }
}

pub fn generate_random_bytes<const N: usize>() -> [u8; N] {
    let mut data = [0u8; N];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

pub fn generate_random_vec(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}
