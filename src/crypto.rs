pub mod common;
pub mod xor;
pub mod engine;
pub mod mode;
pub mod oracle;
pub mod probe;
pub mod attack;

#[cfg(test)]
mod generic_tests {
    use crate::crypto::common::{pad_pkcs_7, repeating_block};
    use crate::crypto::engine::Aes128;
    use crate::crypto::mode::{self, CipherMode};

    #[test]
    fn test_ecb_leaks_repeated_blocks() {
        let engine = Aes128::new(*b"YELLOW SUBMARINE");
        let plaintext = pad_pkcs_7(&[b"I'm back and I'm".repeat(3), b"ringin' the bell".to_vec()].concat(), 16);
        let ecb = mode::encrypt(&engine, CipherMode::Ecb, None, &plaintext).unwrap();
        assert_eq!(Some((1, ecb[..16].to_vec())), repeating_block(&ecb, 16));

        let cbc = mode::encrypt(&engine, CipherMode::Cbc, Some(&[0u8; 16][..]), &plaintext).unwrap();
        assert_eq!(None, repeating_block(&cbc, 16));
    }
}
