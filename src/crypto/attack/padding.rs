use log::{debug, trace};

use crate::crypto::common::bytes_to_blocks;
use crate::crypto::oracle::PaddingOracle;
use crate::crypto::xor::{byte_xor, fixed_xor};
use crate::util::{DecodeExhaustedSnafu, InvalidArgumentSnafu, Result};

// Tampered copy of the ciphertext. Only the second-to-last block is ever
// modified, and blocks are dropped from the end as they are decrypted.
struct Forgery {
    blocks: Vec<Vec<u8>>,
}

impl Forgery {
    fn query(&self, oracle: &dyn PaddingOracle) -> Result<bool> {
        oracle(&self.blocks.concat())
    }

    fn penultimate(&mut self) -> &mut Vec<u8> {
        let n = self.blocks.len();
        &mut self.blocks[n - 2]
    }
}

// Returns the padded plaintext of IV || C. The pad value defaults to 1 when
// no longer padding validates, even if the plaintext ends in 0x02.
pub fn decrypt_with_padding_oracle(
    ciphertext: &[u8],
    oracle: &dyn PaddingOracle,
    block_size: usize,
) -> Result<Vec<u8>> {
    if block_size == 0 || block_size > u8::MAX as usize {
        return InvalidArgumentSnafu {
            reason: format!("block size must be in 1..=255, got {}", block_size),
        }
        .fail();
    }
    if ciphertext.len() % block_size != 0 || ciphertext.len() < 2 * block_size {
        return InvalidArgumentSnafu {
            reason: format!(
                "ciphertext must be an IV plus at least one {}-byte block, got {} bytes",
                block_size,
                ciphertext.len()
            ),
        }
        .fail();
    }

    let original: Vec<Vec<u8>> = bytes_to_blocks(ciphertext, block_size)
        .into_iter()
        .map(|block| block.to_vec())
        .collect();
    let mut forgery = Forgery { blocks: original.clone() };
    let n = original.len();

    let mut pad_value = 1;
    for guess in 2..=block_size as u8 {
        forgery.penultimate()[block_size - 1] = original[n - 2][block_size - 1] ^ guess ^ 1;
        if forgery.query(oracle)? {
            pad_value = guess;
            break;
        }
    }
    *forgery.penultimate() = original[n - 2].clone();
    debug!("final pad value is {}", pad_value);

    let mut known = vec![pad_value; pad_value as usize];
    let mut plaintext: Vec<u8> = Vec::with_capacity(ciphertext.len() - block_size);
    for block_idx in (1..n).rev() {
        let previous = &original[block_idx - 1];
        for i in (0..(block_size - known.len())).rev() {
            let target_pad = (block_size - i) as u8;
            let tail = byte_xor(&known, target_pad);
            let byte = match crack_byte(&mut forgery, oracle, previous, i, target_pad, &tail)? {
                Some(byte) => byte,
                None => {
                    let position = (block_idx - 1) * block_size + i;
                    let recovered = [known, plaintext].concat();
                    return DecodeExhaustedSnafu { position, recovered }.fail();
                }
            };
            trace!("block {} byte {} is {:02x}", block_idx, i, byte);
            known.insert(0, byte);
        }
        plaintext = [std::mem::take(&mut known), plaintext].concat();
        // The tampered block becomes the next one to decrypt
        forgery.blocks.truncate(block_idx);
        forgery.blocks[block_idx - 1] = original[block_idx - 1].clone();
    }
    debug!("decrypted {} bytes", plaintext.len());
    Ok(plaintext)
}

// Tries every value at offset `i` of the previous block, with the bytes after
// it already forced to decrypt as `target_pad`
fn crack_byte(
    forgery: &mut Forgery,
    oracle: &dyn PaddingOracle,
    previous: &[u8],
    i: usize,
    target_pad: u8,
    tail: &[u8],
) -> Result<Option<u8>> {
    for c in 0..=u8::MAX {
        let mask = [vec![0; i], vec![c], tail.to_vec()].concat();
        *forgery.penultimate() = fixed_xor(previous, &mask);
        if !forgery.query(oracle)? {
            continue;
        }
        // A pad value of 1 also validates when the byte before happens to
        // complete a longer padding, so disturb it and ask again
        if target_pad == 1 && i > 0 {
            forgery.penultimate()[i - 1] ^= 0xff;
            if !forgery.query(oracle)? {
                continue;
            }
        }
        return Ok(Some(c ^ target_pad));
    }
    Ok(None)
}

#[cfg(test)]
use base64::{Engine as _, engine::general_purpose};
#[cfg(test)]
use rand::Rng;
#[cfg(test)]
use crate::crypto::common::{generate_random_bytes, pad_pkcs_7, strip_pad_pkcs_7};
#[cfg(test)]
use crate::crypto::engine::Aes128;
#[cfg(test)]
use crate::crypto::mode::cbc::cbc_encrypt;
#[cfg(test)]
use crate::crypto::oracle::cbc_padding_oracle;
#[cfg(test)]
use crate::util::Error;

#[cfg(test)]
fn encrypt_with_iv(engine: &Aes128, plaintext: &[u8]) -> Vec<u8> {
    let iv: [u8; 16] = generate_random_bytes();
    let encrypted = cbc_encrypt(engine, &iv, &pad_pkcs_7(plaintext, 16)).unwrap();
    [&iv[..], &encrypted[..]].concat()
}

#[test]
fn test_attack_cbc_padding() {
    let strs: [&[u8]; 10] = [
        b"MDAwMDAwTm93IHRoYXQgdGhlIHBhcnR5IGlzIGp1bXBpbmc=",
        b"MDAwMDAxV2l0aCB0aGUgYmFzcyBraWNrZWQgaW4gYW5kIHRoZSBWZWdhJ3MgYXJlIHB1bXBpbic=",
        b"MDAwMDAyUXVpY2sgdG8gdGhlIHBvaW50LCB0byB0aGUgcG9pbnQsIG5vIGZha2luZw==",
        b"MDAwMDAzQ29va2luZyBNQydzIGxpa2UgYSBwb3VuZCBvZiBiYWNvbg==",
        b"MDAwMDA0QnVybmluZyAnZW0sIGlmIHlvdSBhaW4ndCBxdWljayBhbmQgbmltYmxl",
        b"MDAwMDA1SSBnbyBjcmF6eSB3aGVuIEkgaGVhciBhIGN5bWJhbA==",
        b"MDAwMDA2QW5kIGEgaGlnaCBoYXQgd2l0aCBhIHNvdXBlZCB1cCB0ZW1wbw==",
        b"MDAwMDA3SSdtIG9uIGEgcm9sbCwgaXQncyB0aW1lIHRvIGdvIHNvbG8=",
        b"MDAwMDA4b2xsaW4nIGluIG15IGZpdmUgcG9pbnQgb2g=",
        b"MDAwMDA5aXRoIG15IHJhZy10b3AgZG93biBzbyBteSBoYWlyIGNhbiBibG93",
    ];

    let engine = Aes128::random();
    let oracle = cbc_padding_oracle(engine.clone());
    for s in strs {
        let s = general_purpose::STANDARD.decode(s).expect("Base64 decoding failed");
        let ciphertext = encrypt_with_iv(&engine, &s);
        let result = decrypt_with_padding_oracle(&ciphertext, &oracle, 16).unwrap();
        assert_eq!(pad_pkcs_7(&s, 16), result);
        assert_eq!(s, strip_pad_pkcs_7(&result, 16).unwrap());
    }
}

#[test]
fn test_attack_cbc_padding_random_choice() {
    let mut rng = rand::thread_rng();
    let engine = Aes128::random();
    let oracle = cbc_padding_oracle(engine.clone());
    let len = rng.gen_range(0..48);
    let s: Vec<u8> = (0..len).map(|_| rng.gen_range(b'a'..=b'z')).collect();
    let ciphertext = encrypt_with_iv(&engine, &s);
    assert_eq!(pad_pkcs_7(&s, 16), decrypt_with_padding_oracle(&ciphertext, &oracle, 16).unwrap());
}

#[test]
fn test_confirms_single_byte_padding() {
    // The first block ends in "\x02!", so forcing its last byte to 2 also
    // gives valid padding
    let engine = Aes128::random();
    let oracle = cbc_padding_oracle(engine.clone());
    let plaintext = b"fourteen bytes\x02!then more text";
    for _ in 0..8 {
        let ciphertext = encrypt_with_iv(&engine, plaintext);
        assert_eq!(48, ciphertext.len());
        let result = decrypt_with_padding_oracle(&ciphertext, &oracle, 16).unwrap();
        assert_eq!(pad_pkcs_7(plaintext, 16), result);
    }
}

#[test]
fn test_invalid_ciphertext_lengths() {
    let engine = Aes128::random();
    let oracle = cbc_padding_oracle(engine);
    assert!(matches!(
        decrypt_with_padding_oracle(&[0u8; 31], &oracle, 16),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        decrypt_with_padding_oracle(&[0u8; 16], &oracle, 16),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        decrypt_with_padding_oracle(&[0u8; 32], &oracle, 0),
        Err(Error::InvalidArgument { .. })
    ));
}

#[test]
fn test_broken_oracle_exhausts() {
    let never = |_: &[u8]| -> Result<bool> { Ok(false) };
    match decrypt_with_padding_oracle(&[0u8; 32], &never, 16) {
        Err(Error::DecodeExhausted { position, recovered }) => {
            assert_eq!(14, position);
            assert_eq!(vec![1u8], recovered);
        }
        other => panic!("expected DecodeExhausted, got {:?}", other),
    }
}
