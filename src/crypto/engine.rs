use openssl::symm::{Cipher, Crypter, Mode};
use snafu::ResultExt;

use crate::crypto::common::generate_random_bytes;
use crate::util::{EngineSnafu, InvalidArgumentSnafu, Result};

/// A keyed block permutation. Modes of operation are built on top of this and
/// never see the key.
pub trait BlockCipherEngine {
    fn block_size(&self) -> usize;
    fn encrypt_block(&self, block: &[u8]) -> Result<Vec<u8>>;
    fn decrypt_block(&self, block: &[u8]) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct Aes128 {
    key: [u8; 16],
}

impl Aes128 {
    pub const BLOCK_SIZE: usize = 16;

    pub fn new(key: [u8; 16]) -> Self {
        Self { key }
    }

    pub fn random() -> Self {
        Self::new(generate_random_bytes())
    }

    fn apply(&self, mode: Mode, block: &[u8]) -> Result<Vec<u8>> {
        if block.len() != Self::BLOCK_SIZE {
            return InvalidArgumentSnafu {
                reason: format!("AES operates on 16-byte blocks, got {}", block.len()),
            }
            .fail();
        }
        let cipher = Cipher::aes_128_ecb();
        let mut crypter = Crypter::new(cipher, mode, &self.key, None).context(EngineSnafu)?;
        crypter.pad(false);
        let mut out = vec![0; Self::BLOCK_SIZE + cipher.block_size()];
        let mut written = crypter.update(block, &mut out).context(EngineSnafu)?;
        written += crypter.finalize(&mut out[written..]).context(EngineSnafu)?;
        out.truncate(written);
        Ok(out)
    }
}

impl BlockCipherEngine for Aes128 {
    fn block_size(&self) -> usize {
        Self::BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &[u8]) -> Result<Vec<u8>> {
        self.apply(Mode::Encrypt, block)
    }

    fn decrypt_block(&self, block: &[u8]) -> Result<Vec<u8>> {
        self.apply(Mode::Decrypt, block)
    }
}

#[test]
fn test_aes_128_known_answer() {
    // FIPS-197 appendix C.1
    let engine = Aes128::new(hex!("000102030405060708090a0b0c0d0e0f"));
    let plaintext = hex!("00112233445566778899aabbccddeeff");
    let expected = hex!("69c4e0d86a7b0430d8cdb78070b4c55a");
    let encrypted = engine.encrypt_block(&plaintext).unwrap();
    assert_eq!(expected.to_vec(), encrypted);
    assert_eq!(plaintext.to_vec(), engine.decrypt_block(&encrypted).unwrap());
}

#[test]
fn test_aes_128_rejects_partial_block() {
    let engine = Aes128::random();
    assert!(matches!(
        engine.encrypt_block(b"short"),
        Err(crate::util::Error::InvalidArgument { .. })
    ));
}
