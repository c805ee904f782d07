//! Error types for peercall.
//!
//! Error messages are intentionally generic so that no key material or
//! plaintext ever reaches error text or log output.

use thiserror::Error;

/// Core error type for peercall operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The cryptographic provider could not produce a keypair.
    /// Fatal for the whole client: no session can be secured without one.
    #[error("key generation failed")]
    KeyGeneration(String),

    /// Shared-secret derivation failed on malformed or incompatible
    /// remote public-key material. Aborts the current negotiation round
    /// but leaves the session usable for renegotiation.
    #[error("key derivation failed")]
    KeyDerivation(String),

    /// Encryption failed, including the no-shared-secret case.
    #[error("encryption failed")]
    Encryption(String),

    /// Authenticated decryption failed: bad tag, malformed length, or
    /// structurally invalid input. Recoverable; the frame is dropped.
    #[error("decryption failed")]
    Decryption(String),

    /// The transport rejected an offer, answer, or candidate.
    #[error("negotiation rejected by transport")]
    NegotiationApply(String),

    /// A file chunk arrived with no active metadata context, or after
    /// the transfer already completed.
    #[error("file transfer integrity violation")]
    TransferIntegrity(String),

    /// Signaling or metadata (de)serialization failed.
    #[error("encoding error")]
    Encoding(String),

    /// Transport or data-channel operation failed.
    #[error("transport error")]
    Transport(String),
}

/// Result type alias using peercall's Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this failure is recoverable for the session.
    ///
    /// Recoverable errors drop the offending message or negotiation round;
    /// the event loop and the session itself carry on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::KeyGeneration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keygen_is_fatal() {
        assert!(!Error::KeyGeneration("rng unavailable".into()).is_recoverable());
        assert!(Error::Decryption("bad tag".into()).is_recoverable());
        assert!(Error::KeyDerivation("bad key".into()).is_recoverable());
    }

    #[test]
    fn test_messages_stay_generic() {
        let err = Error::Decryption("tag mismatch at byte 7".into());
        assert_eq!(err.to_string(), "decryption failed");
    }
}
