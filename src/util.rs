use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("invalid argument: {}", reason))]
    InvalidArgument { reason: String },

    #[snafu(display("ciphertext length never changed for probes of up to {} bytes", max_probe_len))]
    NoSizeChangeObserved { max_probe_len: usize },

    #[snafu(display("oracle returned different outputs for the same {}-byte input", probe_len))]
    RandomizedOracle { probe_len: usize },

    #[snafu(display("cannot classify mode from {} differing bytes at block size {}", diff_count, block_size))]
    UnsupportedMode { diff_count: usize, block_size: usize },

    #[snafu(display("oracle behaved inconsistently: {}", reason))]
    InconsistentOracle { reason: String },

    // The bytes recovered before the search ran dry are kept for diagnostics
    #[snafu(display("no candidate validated at position {} ({} bytes recovered)", position, recovered.len()))]
    DecodeExhausted { position: usize, recovered: Vec<u8> },

    #[snafu(display("invalid PKCS#7 padding"))]
    InvalidPadding {},

    #[snafu(display("block cipher engine failed: {}", source))]
    Engine { source: openssl::error::ErrorStack },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn gcd_of(values: impl IntoIterator<Item = usize>) -> usize {
    values
        .into_iter()
        .fold(0, |acc, v| num::integer::gcd(acc, v))
}

#[test]
fn test_gcd_of() {
    assert_eq!(16, gcd_of([0, 16, 32, 48]));
    assert_eq!(8, gcd_of([24, 16]));
    assert_eq!(0, gcd_of([]));
}

#[test]
fn test_error_display_keeps_progress() {
    let err = Error::DecodeExhausted { position: 4, recovered: b"targ".to_vec() };
    assert_eq!(
        "no candidate validated at position 4 (4 bytes recovered)",
        err.to_string()
    );
}
