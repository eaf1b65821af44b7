// Full-block CFB: each plaintext block is masked with the encryption of the
// previous ciphertext block. A short final block is truncated, not padded.
use crate::crypto::common::bytes_to_blocks;
use crate::crypto::engine::BlockCipherEngine;
use crate::crypto::mode::check_iv;
use crate::crypto::xor::truncating_xor;
use crate::util::Result;

pub fn cfb_encrypt(engine: &dyn BlockCipherEngine, iv: &[u8], buf: &[u8]) -> Result<Vec<u8>> {
    check_iv(engine, iv)?;
    let mut out = Vec::with_capacity(buf.len());
    let mut register = iv.to_vec();
    for block in bytes_to_blocks(buf, engine.block_size()) {
        let keystream = engine.encrypt_block(&register)?;
        let encrypted = truncating_xor(block, &keystream);
        out.extend_from_slice(&encrypted);
        register = encrypted;
    }
    Ok(out)
}

pub fn cfb_decrypt(engine: &dyn BlockCipherEngine, iv: &[u8], buf: &[u8]) -> Result<Vec<u8>> {
    check_iv(engine, iv)?;
    let mut out = Vec::with_capacity(buf.len());
    let mut register = iv;
    for block in bytes_to_blocks(buf, engine.block_size()) {
        let keystream = engine.encrypt_block(register)?;
        out.extend(truncating_xor(block, &keystream));
        register = block;
    }
    Ok(out)
}

#[cfg(test)]
use crate::crypto::engine::Aes128;

#[test]
fn test_cfb_known_answer() {
    // NIST SP 800-38A F.3.13
    let engine = Aes128::new(hex!("2b7e151628aed2a6abf7158809cf4f3c"));
    let iv = hex!("000102030405060708090a0b0c0d0e0f");
    let plaintext = hex!("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");
    let expected = hex!("3b3fd92eb72dad20333449f8e83cfb4ac8a64537a0b3a93fcde3cdad9f1ce58b");
    let encrypted = cfb_encrypt(&engine, &iv, &plaintext).unwrap();
    assert_eq!(expected.to_vec(), encrypted);
    assert_eq!(plaintext.to_vec(), cfb_decrypt(&engine, &iv, &encrypted).unwrap());
}

#[test]
fn test_cfb_partial_final_block() {
    let engine = Aes128::random();
    let iv = [3u8; 16];
    let plaintext = b"twenty one bytes long";
    let encrypted = cfb_encrypt(&engine, &iv, plaintext).unwrap();
    assert_eq!(plaintext.len(), encrypted.len());
    assert_eq!(plaintext.to_vec(), cfb_decrypt(&engine, &iv, &encrypted).unwrap());
}
