use std::io::Read;
use std::{fs, io, path::Path};

use sha2::{Digest, Sha256};

use crate::error::ResolveError;

pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

/// Streams `path` through SHA-256 and compares against `expected_hex`.
///
/// The comparison is case-sensitive; expected digests are lower-case hex.
pub fn verify(path: &Path, expected_hex: &str) -> Result<(), ResolveError> {
    let actual = sha256_file(path)?;
    if actual != expected_hex {
        return Err(ResolveError::Integrity {
            expected: expected_hex.to_string(),
            actual,
        });
    }
    Ok(())
}

pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(nibble_to_hex(b >> 4));
        out.push(nibble_to_hex(b & 0x0f));
    }
    out
}

fn nibble_to_hex(n: u8) -> char {
    match n {
        0..=9 => (b'0' + n) as char,
        10..=15 => (b'a' + (n - 10)) as char,
        _ => '0',
    }
}
