use std::fmt::Write;
use std::io;
use std::path::Path;

use ingest_core::Fingerprint;
use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as lowercase hex.
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

/// URLs are fingerprinted by identity, not by their (volatile) remote content.
pub fn fingerprint_url(url: &str) -> Fingerprint {
    fingerprint_bytes(url.as_bytes())
}

pub async fn fingerprint_file(path: &Path) -> io::Result<Fingerprint> {
    let bytes = tokio::fs::read(path).await?;
    Ok(fingerprint_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_fixed_length_hex() {
        let fp = fingerprint_bytes(b"hello");
        assert_eq!(fp.len(), 64);
        assert_eq!(
            fp,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn url_fingerprint_depends_only_on_the_string() {
        assert_eq!(
            fingerprint_url("https://a.example"),
            fingerprint_url("https://a.example")
        );
        assert_ne!(
            fingerprint_url("https://a.example"),
            fingerprint_url("https://a.example/")
        );
    }
}
