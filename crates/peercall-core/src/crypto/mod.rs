//! Cryptographic primitives.
//!
//! - **X25519**: ephemeral-style key agreement between the two peers
//! - **HKDF-SHA256**: expansion of the raw agreement into a cipher key
//! - **ChaCha20-Poly1305**: authenticated encryption of channel frames
//!
//! Only audited primitives; no custom constructions.

mod aead;
mod keys;

pub use aead::{open, seal, NONCE_SIZE, TAG_SIZE};
pub use keys::{ClientKeypair, PeerPublicKey, SessionSecret, KEY_SIZE};
