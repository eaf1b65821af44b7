use std::fmt;

use crate::crypto::engine::BlockCipherEngine;
use crate::util::{InvalidArgumentSnafu, Result};

pub mod ecb;
pub mod cbc;
pub mod cfb;
pub mod ofb;
pub mod ctr;

/// Mode of operation as far as a black-box observer can tell them apart.
/// `Stream` covers every keystream construction (OFB, CTR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    Ecb,
    Cbc,
    Cfb,
    Stream,
}

impl CipherMode {
    pub fn uses_iv(&self) -> bool {
        match self {
            CipherMode::Ecb => false,
            CipherMode::Cbc | CipherMode::Cfb | CipherMode::Stream => true,
        }
    }
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CipherMode::Ecb => "ECB",
            CipherMode::Cbc => "CBC",
            CipherMode::Cfb => "CFB",
            CipherMode::Stream => "Stream",
        };
        f.write_str(name)
    }
}

pub(crate) fn check_aligned(engine: &dyn BlockCipherEngine, buf: &[u8]) -> Result<()> {
    let block_size = engine.block_size();
    if buf.len() % block_size != 0 {
        return InvalidArgumentSnafu {
            reason: format!(
                "buffer length {} is not a multiple of block size {}",
                buf.len(),
                block_size
            ),
        }
        .fail();
    }
    Ok(())
}

pub(crate) fn check_iv(engine: &dyn BlockCipherEngine, iv: &[u8]) -> Result<()> {
    if iv.len() != engine.block_size() {
        return InvalidArgumentSnafu {
            reason: format!(
                "IV must be {} bytes, got {}",
                engine.block_size(),
                iv.len()
            ),
        }
        .fail();
    }
    Ok(())
}

fn require_iv(mode: CipherMode, iv: Option<&[u8]>) -> Result<&[u8]> {
    match iv {
        Some(iv) => Ok(iv),
        None => InvalidArgumentSnafu {
            reason: format!("{} mode needs an IV", mode),
        }
        .fail(),
    }
}

fn reject_iv(mode: CipherMode, iv: Option<&[u8]>) -> Result<()> {
    match iv {
        Some(_) => InvalidArgumentSnafu {
            reason: format!("{} mode takes no IV", mode),
        }
        .fail(),
        None => Ok(()),
    }
}

/// Encrypts `plaintext` under `mode`. The IV is an explicit input; callers that
/// generate one keep it and ship it alongside the ciphertext themselves.
pub fn encrypt(
    engine: &dyn BlockCipherEngine,
    mode: CipherMode,
    iv: Option<&[u8]>,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    match mode {
        CipherMode::Ecb => {
            reject_iv(mode, iv)?;
            ecb::ecb_encrypt(engine, plaintext)
        }
        CipherMode::Cbc => cbc::cbc_encrypt(engine, require_iv(mode, iv)?, plaintext),
        CipherMode::Cfb => cfb::cfb_encrypt(engine, require_iv(mode, iv)?, plaintext),
        CipherMode::Stream => ofb::ofb_apply(engine, require_iv(mode, iv)?, plaintext),
    }
}

pub fn decrypt(
    engine: &dyn BlockCipherEngine,
    mode: CipherMode,
    iv: Option<&[u8]>,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    match mode {
        CipherMode::Ecb => {
            reject_iv(mode, iv)?;
            ecb::ecb_decrypt(engine, ciphertext)
        }
        CipherMode::Cbc => cbc::cbc_decrypt(engine, require_iv(mode, iv)?, ciphertext),
        CipherMode::Cfb => cfb::cfb_decrypt(engine, require_iv(mode, iv)?, ciphertext),
        CipherMode::Stream => ofb::ofb_apply(engine, require_iv(mode, iv)?, ciphertext),
    }
}

#[cfg(test)]
use crate::crypto::engine::Aes128;
#[cfg(test)]
use crate::crypto::common::pad_pkcs_7;

#[test]
fn test_encrypt_decrypt_every_mode() {
    let engine = Aes128::random();
    let iv = [7u8; 16];
    let plaintext = pad_pkcs_7(b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ", 16);
    for mode in [CipherMode::Ecb, CipherMode::Cbc, CipherMode::Cfb, CipherMode::Stream] {
        let iv = if mode.uses_iv() { Some(&iv[..]) } else { None };
        let ciphertext = encrypt(&engine, mode, iv, &plaintext).unwrap();
        assert_eq!(plaintext.len(), ciphertext.len());
        assert_ne!(plaintext, ciphertext);
        assert_eq!(plaintext, decrypt(&engine, mode, iv, &ciphertext).unwrap());
    }
}

#[test]
fn test_iv_requirements() {
    let engine = Aes128::random();
    let block = [0u8; 16];
    assert!(encrypt(&engine, CipherMode::Cbc, None, &block).is_err());
    assert!(encrypt(&engine, CipherMode::Ecb, Some(&block), &block).is_err());
    assert!(encrypt(&engine, CipherMode::Cfb, Some(&block[..8]), &block).is_err());
}

#[test]
fn test_cipher_mode_display() {
    assert_eq!("ECB", CipherMode::Ecb.to_string());
    assert_eq!("Stream", CipherMode::Stream.to_string());
}
