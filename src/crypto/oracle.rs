use log::trace;
use rand::Rng;

use crate::crypto::common::{generate_random_vec, is_valid_pkcs_7, pad_pkcs_7};
use crate::crypto::engine::{Aes128, BlockCipherEngine};
use crate::crypto::mode::{self, ctr::ctr_apply, CipherMode};
use crate::crypto::xor::fixed_xor;
use crate::util::{InvalidArgumentSnafu, RandomizedOracleSnafu, Result};

/// Chosen-plaintext encryption oracle: attacker bytes in, ciphertext out.
pub trait Oracle: Fn(&[u8]) -> Result<Vec<u8>> {}
impl<T: Fn(&[u8]) -> Result<Vec<u8>>> Oracle for T {}

/// Chosen-ciphertext oracle leaking only whether `IV || C` decrypts to
/// validly padded plaintext.
pub trait PaddingOracle: Fn(&[u8]) -> Result<bool> {}
impl<T: Fn(&[u8]) -> Result<bool>> PaddingOracle for T {}

/// Where an encrypting oracle takes its IV from on each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IvSource {
    Fixed(Vec<u8>),
    Random,
}

impl IvSource {
    pub fn random_fixed(block_size: usize) -> Self {
        IvSource::Fixed(generate_random_vec(block_size))
    }

    fn next_iv(&self, block_size: usize) -> Vec<u8> {
        match self {
            IvSource::Fixed(iv) => iv.clone(),
            IvSource::Random => generate_random_vec(block_size),
        }
    }
}

// Calls the oracle twice on the same input. Everything that assumes a fixed
// key, IV, prefix and suffix goes through here first.
pub fn ensure_deterministic(oracle: &dyn Oracle, message: &[u8]) -> Result<Vec<u8>> {
    let first = oracle(message)?;
    let second = oracle(message)?;
    if first != second {
        trace!(
            "oracle outputs differ for {:?}: {} vs {}",
            hex::encode(message),
            hex::encode(&first),
            hex::encode(&second)
        );
        return RandomizedOracleSnafu { probe_len: message.len() }.fail();
    }
    Ok(first)
}

pub fn get_id_oracle() -> Box<dyn Oracle> {
    Box::new(move |buf: &[u8]| -> Result<Vec<u8>> {
        Ok(buf.to_vec())
    })
}

pub fn choose_random<'a>(f: impl Oracle + 'a, g: impl Oracle + 'a) -> (bool, impl Oracle + 'a) {
    let mut rng = rand::thread_rng();
    let choose_f: bool = rng.gen();
    (choose_f, move |buf: &[u8]| -> Result<Vec<u8>> {
        match choose_f {
            true  => f(buf),
            false => g(buf),
        }
    })
}

impl dyn Oracle {
    pub fn pullback_add_left_padding(self: Box<dyn Oracle>, lpad: &[u8]) -> Box<dyn Oracle> {
        let owned_lpad = lpad.to_owned();
        Box::new(move |buf: &[u8]| -> Result<Vec<u8>> {
            let joined = [
                &owned_lpad,
                buf,
            ].concat();
            self(&joined)
        })
    }

    pub fn pullback_add_right_padding(self: Box<dyn Oracle>, rpad: &[u8]) -> Box<dyn Oracle> {
        let owned_rpad = rpad.to_owned();
        Box::new(move |buf: &[u8]| -> Result<Vec<u8>> {
            let joined = [
                buf,
                &owned_rpad,
            ].concat();
            self(&joined)
        })
    }

    // Each listed byte of attacker input is wrapped in double quotes
    pub fn pullback_quote(self: Box<dyn Oracle>, quote_chars: &[u8]) -> Box<dyn Oracle> {
        let owned_quote_chars = quote_chars.to_owned();
        Box::new(move |buf: &[u8]| -> Result<Vec<u8>> {
            let quoted: Vec<u8> = buf.iter()
                .flat_map(|&b| match owned_quote_chars.contains(&b) {
                    true  => vec![b'"', b, b'"'],
                    false => vec![b],
                })
                .collect();
            self(&quoted)
        })
    }

    pub fn pullback_add_random_left_padding<const MIN: usize, const MAX: usize>(self: Box<dyn Oracle>) -> Box<dyn Oracle> {
        let pad_len: usize = rand::thread_rng().gen_range(MIN..=MAX);
        self.pullback_add_left_padding(&generate_random_vec(pad_len))
    }

    pub fn pullback_add_random_right_padding<const MIN: usize, const MAX: usize>(self: Box<dyn Oracle>) -> Box<dyn Oracle> {
        let pad_len: usize = rand::thread_rng().gen_range(MIN..=MAX);
        self.pullback_add_right_padding(&generate_random_vec(pad_len))
    }

    pub fn pushforward_pkcs_7(self: Box<dyn Oracle>, block_size: usize) -> Box<dyn Oracle> {
        Box::new(move |buf: &[u8]| -> Result<Vec<u8>> {
            let out = self(buf)?;
            Ok(pad_pkcs_7(&out, block_size))
        })
    }

    // The IV used for each call is returned in front of the ciphertext
    pub fn pushforward_encrypt<E>(self: Box<dyn Oracle>, engine: E, mode: CipherMode, iv: IvSource) -> Box<dyn Oracle>
    where
        E: BlockCipherEngine + 'static,
    {
        Box::new(move |buf: &[u8]| -> Result<Vec<u8>> {
            let plaintext = self(buf)?;
            match mode.uses_iv() {
                true => {
                    let iv = iv.next_iv(engine.block_size());
                    let ciphertext = mode::encrypt(&engine, mode, Some(&iv), &plaintext)?;
                    Ok([iv, ciphertext].concat())
                }
                false => mode::encrypt(&engine, mode, None, &plaintext),
            }
        })
    }

    pub fn pushforward_encrypt_fixed_key(self: Box<dyn Oracle>, mode: CipherMode, iv: IvSource) -> Box<dyn Oracle> {
        self.pushforward_encrypt(Aes128::random(), mode, iv)
    }

    pub fn pushforward_ecb_encrypt_fixed_key(self: Box<dyn Oracle>) -> Box<dyn Oracle> {
        self.pushforward_encrypt_fixed_key(CipherMode::Ecb, IvSource::Random)
    }

    // Fixed-nonce CTR; the nonce is not part of the output
    pub fn pushforward_ctr_encrypt_fixed_key(self: Box<dyn Oracle>, nonce: u64) -> Box<dyn Oracle> {
        let engine = Aes128::random();
        Box::new(move |buf: &[u8]| -> Result<Vec<u8>> {
            let plaintext = self(buf)?;
            ctr_apply(&engine, nonce, &plaintext)
        })
    }
}

// Only the final block decides PKCS#7 validity, so only that block is decrypted
pub fn cbc_padding_oracle<E>(engine: E) -> Box<dyn PaddingOracle>
where
    E: BlockCipherEngine + 'static,
{
    Box::new(move |ciphertext: &[u8]| -> Result<bool> {
        let block_size = engine.block_size();
        let n = ciphertext.len();
        if n % block_size != 0 || n < 2 * block_size {
            return InvalidArgumentSnafu {
                reason: format!("padding oracle needs IV plus whole blocks, got {} bytes", n),
            }
            .fail();
        }
        let last = &ciphertext[(n - block_size)..];
        let previous = &ciphertext[(n - 2 * block_size)..(n - block_size)];
        let plaintext = fixed_xor(&engine.decrypt_block(last)?, previous);
        Ok(is_valid_pkcs_7(&plaintext))
    })
}

#[cfg(test)]
use crate::crypto::mode::cbc::cbc_encrypt;
#[cfg(test)]
use crate::util::Error;

#[test]
fn test_combinators_compose_left_to_right() {
    let oracle = get_id_oracle()
        .pullback_add_left_padding(b"<<")
        .pullback_add_right_padding(b">>")
        .pushforward_pkcs_7(8);
    assert_eq!(b"<<abc>>\x01".to_vec(), oracle(b"abc").unwrap());
}

#[test]
fn test_pullback_quote() {
    let oracle = get_id_oracle()
        .pullback_add_left_padding(b"k=")
        .pullback_quote(b";=");
    assert_eq!(b"k=a\";\"b\"=\"c".to_vec(), oracle(b"a;b=c").unwrap());
    assert_eq!(b"k=plain".to_vec(), oracle(b"plain").unwrap());
}

#[test]
fn test_random_padding_is_fixed_per_oracle() {
    let oracle = get_id_oracle()
        .pullback_add_random_left_padding::<3, 9>()
        .pullback_add_random_right_padding::<0, 4>();
    let first = oracle(b"x").unwrap();
    assert!(first.len() >= 4 && first.len() <= 14);
    assert_eq!(first, oracle(b"x").unwrap());
}

#[test]
fn test_pushforward_encrypt_prepends_iv() {
    let iv = b"0123456789abcdef".to_vec();
    let engine = Aes128::random();
    let oracle = get_id_oracle()
        .pushforward_pkcs_7(16)
        .pushforward_encrypt(engine.clone(), CipherMode::Cbc, IvSource::Fixed(iv.clone()));
    let out = oracle(b"hello").unwrap();
    assert_eq!(32, out.len());
    assert_eq!(iv, out[..16].to_vec());
    let expected = cbc_encrypt(&engine, &iv, &pad_pkcs_7(b"hello", 16)).unwrap();
    assert_eq!(expected, out[16..].to_vec());
}

#[test]
fn test_ensure_deterministic() {
    let fixed = get_id_oracle()
        .pushforward_pkcs_7(16)
        .pushforward_encrypt_fixed_key(CipherMode::Cbc, IvSource::random_fixed(16));
    assert!(ensure_deterministic(&fixed, b"abc").is_ok());

    let randomized = get_id_oracle()
        .pushforward_pkcs_7(16)
        .pushforward_encrypt_fixed_key(CipherMode::Cbc, IvSource::Random);
    assert!(matches!(
        ensure_deterministic(&randomized, b"abc"),
        Err(Error::RandomizedOracle { probe_len: 3 })
    ));
}

#[test]
fn test_cbc_padding_oracle() {
    let engine = Aes128::random();
    let iv = [9u8; 16];
    let oracle = cbc_padding_oracle(engine.clone());

    let good = cbc_encrypt(&engine, &iv, &pad_pkcs_7(b"attack at dawn", 16)).unwrap();
    assert!(oracle(&[&iv[..], &good[..]].concat()).unwrap());

    let bad = cbc_encrypt(&engine, &iv, b"attack at dawn!\x02").unwrap();
    assert!(!oracle(&[&iv[..], &bad[..]].concat()).unwrap());

    assert!(oracle(&iv).is_err());
}
