//! X25519 key exchange.
//!
//! Each client generates one keypair at startup and reuses it across calls.
//! Both peers, given their own private key and the other's public key,
//! derive bit-identical symmetric key material. Secret material is
//! zeroized on drop.

use crate::error::{Error, Result};
use crate::logging::key_fingerprint;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of X25519 keys and derived session secrets in bytes.
pub const KEY_SIZE: usize = 32;

/// HKDF info string binding derived keys to this protocol.
const HKDF_INFO: &[u8] = b"peercall session key v1";

/// A peer's X25519 public key, as received during negotiation.
#[derive(Clone, PartialEq, Eq)]
pub struct PeerPublicKey([u8; KEY_SIZE]);

impl PeerPublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Wire form used in negotiation messages.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Parse the wire form. Fails on anything that is not a base64
    /// encoding of exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| Error::KeyDerivation("invalid public key encoding".into()))?;
        let bytes: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::KeyDerivation("invalid public key length".into()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for PeerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerPublicKey({}...)", key_fingerprint(&self.0))
    }
}

/// Symmetric key derived from X25519 agreement, ready for AEAD use.
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionSecret([u8; KEY_SIZE]);

impl SessionSecret {
    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Build from raw bytes. Intended for tests and key import.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl PartialEq for SessionSecret {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time comparison; secrets are compared in tests and
        // must not leak via timing elsewhere.
        let mut diff = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionSecret([REDACTED])")
    }
}

/// The client's long-lived X25519 keypair.
///
/// Generated once at client startup and shared across sessions; the
/// secret half never leaves this type.
pub struct ClientKeypair {
    secret: StaticSecret,
    public: PeerPublicKey,
}

impl ClientKeypair {
    /// Generate a fresh keypair.
    ///
    /// Fails with [`Error::KeyGeneration`] if the system RNG is
    /// unavailable. That is fatal for the client: no session can be
    /// secured without a keypair.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        let secret = StaticSecret::from(bytes);
        bytes.zeroize();
        let public = PeerPublicKey(*PublicKey::from(&secret).as_bytes());
        Ok(Self { secret, public })
    }

    /// Get the public half for inclusion in negotiation messages.
    pub fn public_key(&self) -> &PeerPublicKey {
        &self.public
    }

    /// Derive the shared session secret from our private key and the
    /// peer's public key.
    ///
    /// The raw Diffie-Hellman output is expanded through HKDF-SHA256
    /// rather than used directly as a cipher key. Deterministic: both
    /// peers derive the same secret.
    pub fn derive(&self, remote: &PeerPublicKey) -> Result<SessionSecret> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(remote.0));
        if !shared.was_contributory() {
            return Err(Error::KeyDerivation("non-contributory remote key".into()));
        }

        let hkdf = Hkdf::<Sha256>::new(None, shared.as_bytes());
        let mut key = [0u8; KEY_SIZE];
        hkdf.expand(HKDF_INFO, &mut key)
            .map_err(|_| Error::KeyDerivation("HKDF expansion failed".into()))?;
        Ok(SessionSecret(key))
    }
}

impl fmt::Debug for ClientKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientKeypair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
