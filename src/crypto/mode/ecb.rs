use crate::crypto::common::bytes_to_blocks;
use crate::crypto::engine::BlockCipherEngine;
use crate::crypto::mode::check_aligned;
use crate::util::Result;

pub fn ecb_encrypt(engine: &dyn BlockCipherEngine, buf: &[u8]) -> Result<Vec<u8>> {
    check_aligned(engine, buf)?;
    let blocks = bytes_to_blocks(buf, engine.block_size())
        .into_iter()
        .map(|block| engine.encrypt_block(block))
        .collect::<Result<Vec<_>>>()?;
    Ok(blocks.concat())
}

pub fn ecb_decrypt(engine: &dyn BlockCipherEngine, buf: &[u8]) -> Result<Vec<u8>> {
    check_aligned(engine, buf)?;
    let blocks = bytes_to_blocks(buf, engine.block_size())
        .into_iter()
        .map(|block| engine.decrypt_block(block))
        .collect::<Result<Vec<_>>>()?;
    Ok(blocks.concat())
}

#[cfg(test)]
use crate::crypto::engine::Aes128;

#[test]
fn test_ecb_known_answer() {
    // NIST SP 800-38A F.1.1
    let engine = Aes128::new(hex!("2b7e151628aed2a6abf7158809cf4f3c"));
    let plaintext = hex!("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");
    let expected = hex!("3ad77bb40d7a3660a89ecaf32466ef97f5d3d58503b9699de785895a96fdbaaf");
    let encrypted = ecb_encrypt(&engine, &plaintext).unwrap();
    assert_eq!(expected.to_vec(), encrypted);
    assert_eq!(plaintext.to_vec(), ecb_decrypt(&engine, &encrypted).unwrap());
}

#[test]
fn test_ecb_repeats_identical_blocks() {
    let engine = Aes128::random();
    let encrypted = ecb_encrypt(&engine, &[b'A'; 32]).unwrap();
    assert_eq!(encrypted[0..16], encrypted[16..32]);
}

#[test]
fn test_ecb_rejects_unaligned_input() {
    let engine = Aes128::random();
    assert!(ecb_encrypt(&engine, b"not sixteen").is_err());
}
