use crate::crypto::common::bytes_to_blocks;
use crate::crypto::engine::BlockCipherEngine;
use crate::crypto::mode::check_iv;
use crate::crypto::xor::truncating_xor;
use crate::util::Result;

// Encryption and decryption are the same keystream XOR
pub fn ofb_apply(engine: &dyn BlockCipherEngine, iv: &[u8], buf: &[u8]) -> Result<Vec<u8>> {
    check_iv(engine, iv)?;
    let mut out = Vec::with_capacity(buf.len());
    let mut keystream = iv.to_vec();
    for block in bytes_to_blocks(buf, engine.block_size()) {
        keystream = engine.encrypt_block(&keystream)?;
        out.extend(truncating_xor(block, &keystream));
    }
    Ok(out)
}

#[cfg(test)]
use crate::crypto::engine::Aes128;

#[test]
fn test_ofb_known_answer() {
    // NIST SP 800-38A F.4.1
    let engine = Aes128::new(hex!("2b7e151628aed2a6abf7158809cf4f3c"));
    let iv = hex!("000102030405060708090a0b0c0d0e0f");
    let plaintext = hex!("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");
    let expected = hex!("3b3fd92eb72dad20333449f8e83cfb4a7789508d16918f03f53c52dac54ed825");
    let encrypted = ofb_apply(&engine, &iv, &plaintext).unwrap();
    assert_eq!(expected.to_vec(), encrypted);
    assert_eq!(plaintext.to_vec(), ofb_apply(&engine, &iv, &encrypted).unwrap());
}
