//! Random hex session ids.

use std::fmt::Write;

use rand::Rng;

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn random_hex<const N: usize>() -> String {
    let bytes: [u8; N] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// 32 random bytes as hex; identifies one browser session.
#[must_use]
pub fn generate_session_id() -> String {
    random_hex::<32>()
}
