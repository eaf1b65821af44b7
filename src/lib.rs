//! Recovers the structure and secrets of block-cipher oracles from the
//! outside: block size, mode, hidden prefix and suffix lengths, byte-at-a-time
//! suffix decoding, and CBC padding-oracle decryption.

#[cfg(test)]
#[macro_use]
extern crate hex_literal;

mod config;
mod util;
mod crypto;

pub use config::*;
pub use util::*;
pub use crypto::*;
