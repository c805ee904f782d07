//! Authenticated encryption for the secure channel.
//!
//! Every frame is ChaCha20-Poly1305 under the derived session secret,
//! with a fresh random 96-bit nonce prepended to the ciphertext:
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use super::keys::SessionSecret;
use crate::error::{Error, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

/// Size of the per-message nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Encrypt a payload under the session secret.
///
/// A fresh random nonce is generated for every call; nonce reuse under
/// the same key never occurs. Output is `nonce || ciphertext || tag`.
pub fn seal(secret: &SessionSecret, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(secret.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| Error::Encryption("AEAD seal failed".into()))?;

    let mut framed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    framed.extend_from_slice(&nonce_bytes);
    framed.extend_from_slice(&ciphertext);
    Ok(framed)
}

/// Decrypt a `nonce || ciphertext || tag` frame.
///
/// Fails with [`Error::Decryption`] on malformed length or tag
/// verification failure. Never panics; the error carries no detail
/// usable as a decryption oracle.
pub fn open(secret: &SessionSecret, framed: &[u8]) -> Result<Vec<u8>> {
    if framed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::Decryption("frame too short".into()));
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(secret.as_bytes()));
    let nonce = Nonce::from_slice(&framed[..NONCE_SIZE]);

    cipher
        .decrypt(nonce, &framed[NONCE_SIZE..])
        .map_err(|_| Error::Decryption("authentication failed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> SessionSecret {
        SessionSecret::from_bytes([42u8; 32])
    }

    #[test]
    fn test_roundtrip() {
        let secret = test_secret();
        let plaintext = b"hello over the secure channel";

        let framed = seal(&secret, plaintext).expect("seal");
        assert_eq!(framed.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);

        let opened = open(&secret, &framed).expect("open");
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_fresh_nonce_every_call() {
        let secret = test_secret();
        let a = seal(&secret, b"same payload").expect("seal");
        let b = seal(&secret, b"same payload").expect("seal");
        assert_ne!(&a[..NONCE_SIZE], &b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tampered_tag_rejected() {
        let secret = test_secret();
        let mut framed = seal(&secret, b"integrity matters").expect("seal");
        let last = framed.len() - 1;
        framed[last] ^= 0x01;
        assert!(matches!(open(&secret, &framed), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let secret = test_secret();
        let mut framed = seal(&secret, b"integrity matters").expect("seal");
        framed[NONCE_SIZE] ^= 0xFF;
        assert!(matches!(open(&secret, &framed), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let framed = seal(&test_secret(), b"secret").expect("seal");
        let other = SessionSecret::from_bytes([43u8; 32]);
        assert!(open(&other, &framed).is_err());
    }

    #[test]
    fn test_short_input_rejected() {
        let secret = test_secret();
        assert!(matches!(open(&secret, b""), Err(Error::Decryption(_))));
        assert!(matches!(open(&secret, b"abc"), Err(Error::Decryption(_))));
        // One byte short of the minimum frame.
        let short = vec![0u8; NONCE_SIZE + TAG_SIZE - 1];
        assert!(matches!(open(&secret, &short), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_empty_plaintext() {
        let secret = test_secret();
        let framed = seal(&secret, b"").expect("seal");
        assert_eq!(framed.len(), NONCE_SIZE + TAG_SIZE);
        assert!(open(&secret, &framed).expect("open").is_empty());
    }
}
