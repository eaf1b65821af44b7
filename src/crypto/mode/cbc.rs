use crate::crypto::common::bytes_to_blocks;
use crate::crypto::engine::BlockCipherEngine;
use crate::crypto::mode::{check_aligned, check_iv};
use crate::crypto::xor::fixed_xor;
use crate::util::Result;

pub fn cbc_encrypt(engine: &dyn BlockCipherEngine, iv: &[u8], buf: &[u8]) -> Result<Vec<u8>> {
    check_iv(engine, iv)?;
    check_aligned(engine, buf)?;
    let blocks = bytes_to_blocks(buf, engine.block_size());
    let mut enc_blocks: Vec<Vec<u8>> = Vec::with_capacity(blocks.len() + 1);
    enc_blocks.push(iv.to_vec());
    for (i, block) in blocks.iter().enumerate() {
        let xored = fixed_xor(&enc_blocks[i], block);
        enc_blocks.push(engine.encrypt_block(&xored)?);
    }
    Ok(enc_blocks[1..].concat())
}

pub fn cbc_decrypt(engine: &dyn BlockCipherEngine, iv: &[u8], buf: &[u8]) -> Result<Vec<u8>> {
    check_iv(engine, iv)?;
    check_aligned(engine, buf)?;
    let blocks = bytes_to_blocks(buf, engine.block_size());
    let mut dec_blocks: Vec<Vec<u8>> = Vec::with_capacity(blocks.len());
    let mut previous = iv;
    for block in blocks {
        let decrypted = engine.decrypt_block(block)?;
        dec_blocks.push(fixed_xor(&decrypted, previous));
        previous = block;
    }
    Ok(dec_blocks.concat())
}

#[cfg(test)]
use crate::crypto::engine::Aes128;
#[cfg(test)]
use crate::crypto::common::pad_pkcs_7;

#[test]
fn test_cbc_known_answer() {
    // NIST SP 800-38A F.2.1
    let engine = Aes128::new(hex!("2b7e151628aed2a6abf7158809cf4f3c"));
    let iv = hex!("000102030405060708090a0b0c0d0e0f");
    let plaintext = hex!("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");
    let expected = hex!("7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2");
    let encrypted = cbc_encrypt(&engine, &iv, &plaintext).unwrap();
    assert_eq!(expected.to_vec(), encrypted);
    assert_eq!(plaintext.to_vec(), cbc_decrypt(&engine, &iv, &encrypted).unwrap());
}

#[test]
fn test_cbc_encrypt_and_decrypt() {
    let plaintext = pad_pkcs_7(b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ", 16);
    let engine = Aes128::new(*b"YELLOW SUBMARINE");
    let iv = b"yellow submarine";
    let ciphertext = cbc_encrypt(&engine, iv, &plaintext).unwrap();
    let result = cbc_decrypt(&engine, iv, &ciphertext).unwrap();
    assert_eq!(plaintext, result);
}

#[test]
fn test_cbc_hides_identical_blocks() {
    let engine = Aes128::random();
    let encrypted = cbc_encrypt(&engine, &[0u8; 16], &[b'A'; 32]).unwrap();
    assert_ne!(encrypted[0..16], encrypted[16..32]);
}
