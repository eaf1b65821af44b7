use concat_arrays::concat_arrays;

use crate::crypto::engine::BlockCipherEngine;
use crate::crypto::xor::truncating_xor;
use crate::util::{InvalidArgumentSnafu, Result};

const CTR_BLOCK_SIZE: usize = 16;

// Counter block is little-endian nonce followed by little-endian block counter
pub fn ctr_apply(engine: &dyn BlockCipherEngine, nonce: u64, buf: &[u8]) -> Result<Vec<u8>> {
    if engine.block_size() != CTR_BLOCK_SIZE {
        return InvalidArgumentSnafu {
            reason: format!("CTR needs a 16-byte block cipher, got {}", engine.block_size()),
        }
        .fail();
    }
    let mut out = Vec::with_capacity(buf.len());
    for (counter, chunk) in buf.chunks(CTR_BLOCK_SIZE).enumerate() {
        let ctr_nonce: [u8; CTR_BLOCK_SIZE] =
            concat_arrays!(nonce.to_le_bytes(), (counter as u64).to_le_bytes());
        let keystream = engine.encrypt_block(&ctr_nonce)?;
        out.extend(truncating_xor(chunk, &keystream));
    }
    Ok(out)
}

#[cfg(test)]
use base64::{Engine as _, engine::general_purpose};
#[cfg(test)]
use crate::crypto::engine::Aes128;

#[test]
fn test_ctr_apply() {
    let case = b"L77na/nrFsKvynd6HzOoG7GHTLXsTVu9qvY/2syLXzhPweyyMTJULu/6/kXX0KSvoOLSFQ==";
    let ciphertext = general_purpose::STANDARD
        .decode(case)
        .expect("Base64 decoding failed");
    let engine = Aes128::new(*b"YELLOW SUBMARINE");
    let returned = ctr_apply(&engine, 0, &ciphertext).unwrap();
    let expected = b"Yo, VIP Let's kick it Ice, Ice, baby Ice, Ice, baby ".to_vec();
    assert_eq!(expected, returned);
}
