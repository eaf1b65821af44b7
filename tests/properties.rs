use rand::Rng;

use blockprobe::attack::byte_by_byte::decode_suffix;
use blockprobe::attack::padding::decrypt_with_padding_oracle;
use blockprobe::common::{generate_random_bytes, generate_random_vec, pad_pkcs_7, strip_pad_pkcs_7};
use blockprobe::engine::Aes128;
use blockprobe::mode::cbc::cbc_encrypt;
use blockprobe::mode::CipherMode;
use blockprobe::oracle::{cbc_padding_oracle, get_id_oracle, IvSource, Oracle};
use blockprobe::probe::{diagnose_mode, get_additional_message_len, get_block_size, probe, uses_ecb};
use blockprobe::{AttackConfig, Error};

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn ecb_oracle(prefix: &[u8], suffix: &[u8]) -> Box<dyn Oracle> {
    get_id_oracle()
        .pullback_add_left_padding(prefix)
        .pullback_add_right_padding(suffix)
        .pushforward_pkcs_7(16)
        .pushforward_ecb_encrypt_fixed_key()
}

fn fixed_iv_oracle(mode: CipherMode, prefix: &[u8], suffix: &[u8]) -> Box<dyn Oracle> {
    get_id_oracle()
        .pullback_add_left_padding(prefix)
        .pullback_add_right_padding(suffix)
        .pushforward_pkcs_7(16)
        .pushforward_encrypt_fixed_key(mode, IvSource::random_fixed(16))
}

fn random_alphanumeric(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())])
        .collect()
}

#[test]
fn ecb_lengths_for_every_prefix_and_suffix() {
    for prefix_len in 0..=40 {
        for suffix_len in 0..=40 {
            let oracle = ecb_oracle(&generate_random_vec(prefix_len), &generate_random_vec(suffix_len));
            assert_eq!(16, get_block_size(&oracle, 32, &[]).unwrap());
            assert_eq!(
                (prefix_len, suffix_len),
                get_additional_message_len(&oracle, 16, &[]).unwrap(),
                "prefix {} suffix {}",
                prefix_len,
                suffix_len
            );
        }
    }
}

#[test]
fn target123_end_to_end() {
    let oracle = ecb_oracle(b"AAAAAA", b"target123");
    assert_eq!(16, get_block_size(&oracle, 32, &[]).unwrap());
    assert!(uses_ecb(&oracle, 16, &[]).unwrap());
    assert_eq!(CipherMode::Ecb, diagnose_mode(&oracle, 16, 6, &[]).unwrap());
    assert_eq!((6, 9), get_additional_message_len(&oracle, 16, &[]).unwrap());
    assert_eq!(b"target123".to_vec(), decode_suffix(&oracle, 9, 6, 16, &[]).unwrap());
}

#[test]
fn mode_labels() {
    let mut rng = rand::thread_rng();
    for mode in [CipherMode::Ecb, CipherMode::Cfb, CipherMode::Stream] {
        for _ in 0..10 {
            let oracle = fixed_iv_oracle(
                mode,
                &generate_random_vec(rng.gen_range(0..=40)),
                &generate_random_vec(rng.gen_range(0..=40)),
            );
            assert_eq!(mode, probe(&oracle, &AttackConfig::default()).unwrap().mode);
        }
    }

    let ctr = get_id_oracle()
        .pullback_add_left_padding(&generate_random_vec(11))
        .pullback_add_right_padding(&generate_random_vec(23))
        .pushforward_pkcs_7(16)
        .pushforward_ctr_encrypt_fixed_key(rng.gen());
    assert_eq!(CipherMode::Stream, probe(&ctr, &AttackConfig::default()).unwrap().mode);
}

#[test]
fn cbc_label_holds_in_nearly_every_trial() {
    let mut rng = rand::thread_rng();
    let correct = (0..100)
        .filter(|_| {
            let oracle = fixed_iv_oracle(
                CipherMode::Cbc,
                &generate_random_vec(rng.gen_range(0..=40)),
                &generate_random_vec(rng.gen_range(0..=40)),
            );
            matches!(
                probe(&oracle, &AttackConfig::default()),
                Ok(result) if result.mode == CipherMode::Cbc
            )
        })
        .count();
    assert!(correct >= 99, "only {} of 100 trials labelled CBC", correct);
}

#[test]
fn padding_oracle_decrypts_every_length() {
    for _ in 0..20 {
        let engine = Aes128::random();
        let oracle = cbc_padding_oracle(engine.clone());
        for len in 0..=64 {
            let plaintext = random_alphanumeric(len);
            let iv: [u8; 16] = generate_random_bytes();
            let padded = pad_pkcs_7(&plaintext, 16);
            let ciphertext = [iv.to_vec(), cbc_encrypt(&engine, &iv, &padded).unwrap()].concat();

            let result = decrypt_with_padding_oracle(&ciphertext, &oracle, 16).unwrap();
            assert_eq!(padded, result, "length {}", len);
            assert_eq!(plaintext, strip_pad_pkcs_7(&result, 16).unwrap());
        }
    }
}

#[test]
fn padding_oracle_rejects_malformed_ciphertext() {
    let oracle = cbc_padding_oracle(Aes128::random());
    assert!(matches!(
        decrypt_with_padding_oracle(&[0u8; 31], &oracle, 16),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        decrypt_with_padding_oracle(&[0u8; 16], &oracle, 16),
        Err(Error::InvalidArgument { .. })
    ));
}

#[test]
fn randomized_iv_is_detected() {
    let oracle = get_id_oracle()
        .pullback_add_left_padding(b"AAAAAA")
        .pullback_add_right_padding(b"target123")
        .pushforward_pkcs_7(16)
        .pushforward_encrypt_fixed_key(CipherMode::Cbc, IvSource::Random);
    assert!(matches!(
        get_additional_message_len(&oracle, 16, &[]),
        Err(Error::RandomizedOracle { .. })
    ));
    assert!(matches!(
        decode_suffix(&oracle, 9, 22, 16, &[]),
        Err(Error::RandomizedOracle { .. })
    ));
}
