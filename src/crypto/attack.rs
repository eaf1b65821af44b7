use log::debug;

use crate::config::AttackConfig;
use crate::crypto::oracle::Oracle;
use crate::crypto::probe::{probe, ProbeResult};
use crate::util::Result;

pub mod byte_by_byte;
pub mod padding;

/// Probes the oracle and then decodes its whole secret suffix.
pub fn recover_suffix(oracle: &dyn Oracle, config: &AttackConfig) -> Result<(ProbeResult, Vec<u8>)> {
    let result = probe(oracle, config)?;
    debug!("decoding suffix behind {} oracle", result.mode);
    let suffix = byte_by_byte::decode_suffix(
        oracle,
        result.suffix_len,
        result.prefix_len,
        result.block_size,
        &config.allowed_bytes,
    )?;
    Ok((result, suffix))
}

#[cfg(test)]
mod generic_tests {
    use base64::{Engine as _, engine::general_purpose};

    use crate::config::AttackConfig;
    use crate::crypto::attack::recover_suffix;
    use crate::crypto::mode::CipherMode;
    use crate::crypto::oracle::{get_id_oracle, IvSource, Oracle};
    use crate::util::Error;

    #[test]
    fn test_recover_suffix_ecb() {
        let unknown_string = b"Um9sbGluJyBpbiBteSA1LjAKV2l0aCBteSByYWctdG9wIGRvd24gc28gbXkgaGFpciBjYW4gYmxvdwpUaGUgZ2lybGllcyBvbiBzdGFuZGJ5IHdhdmluZyBqdXN0IHRvIHNheSBoaQpEaWQgeW91IHN0b3A/IE5vLCBJIGp1c3QgZHJvdmUgYnkK";
        let unknown = general_purpose::STANDARD
            .decode(unknown_string)
            .expect("Base64 decoding failed");

        for _ in 0..5 {
            let oracle = get_id_oracle()
                .pullback_add_random_left_padding::<0, 100>()
                .pullback_add_right_padding(&unknown)
                .pushforward_pkcs_7(16)
                .pushforward_ecb_encrypt_fixed_key();
            let (result, suffix) = recover_suffix(&oracle, &AttackConfig::default()).unwrap();
            assert_eq!(CipherMode::Ecb, result.mode);
            assert_eq!(unknown.len(), result.suffix_len);
            assert_eq!(unknown, suffix);
        }
    }

    #[test]
    fn test_recover_suffix_fixed_iv_modes() {
        let secret = b"comment2=%20like%20a%20pound%20of%20bacon";
        for mode in [CipherMode::Cbc, CipherMode::Cfb, CipherMode::Stream] {
            let oracle = get_id_oracle()
                .pullback_add_left_padding(b"comment1=cooking%20MCs;userdata=")
                .pullback_add_right_padding(secret)
                .pushforward_pkcs_7(16)
                .pushforward_encrypt_fixed_key(mode, IvSource::random_fixed(16));
            let config = AttackConfig::default().with_allowed_bytes(
                b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789%=;",
            );
            let (result, suffix) = recover_suffix(&oracle, &config).unwrap();
            assert_eq!(mode, result.mode);
            assert_eq!(32 + 16, result.prefix_len);
            assert_eq!(secret.to_vec(), suffix);
        }
    }

    fn quoting_oracle(suffix: &[u8]) -> Box<dyn Oracle> {
        get_id_oracle()
            .pullback_add_left_padding(b"comment1=cooking%20MCs;userdata=")
            .pullback_add_right_padding(suffix)
            .pullback_quote(b";=")
            .pushforward_pkcs_7(16)
            .pushforward_ecb_encrypt_fixed_key()
    }

    fn unquoted_printable() -> Vec<u8> {
        (b' '..=b'~').filter(|b| !b";=".contains(b)).collect()
    }

    #[test]
    fn test_recover_suffix_quoting_oracle() {
        let oracle = quoting_oracle(b"comment2 like a pound of bacon");
        let config = AttackConfig::default().with_allowed_bytes(&unquoted_printable());
        let (result, suffix) = recover_suffix(&oracle, &config).unwrap();
        assert_eq!(CipherMode::Ecb, result.mode);
        assert_eq!(32, result.prefix_len);
        assert_eq!(30, result.suffix_len);
        assert_eq!(b"comment2 like a pound of bacon".to_vec(), suffix);
    }

    #[test]
    fn test_recover_suffix_stops_at_quoted_byte() {
        let oracle = quoting_oracle(b"comment2=like");
        let config = AttackConfig::default().with_allowed_bytes(&unquoted_printable());
        match recover_suffix(&oracle, &config) {
            Err(Error::DecodeExhausted { position, recovered }) => {
                assert_eq!(8, position);
                assert_eq!(b"comment2".to_vec(), recovered);
            }
            other => panic!("expected DecodeExhausted, got {:?}", other),
        }
    }
}
