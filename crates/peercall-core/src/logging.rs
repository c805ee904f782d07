//! Logging helpers that keep key material out of log output.

use std::fmt;

/// A wrapper that redacts its contents when displayed.
pub struct Redacted<T>(pub T);

impl<T: fmt::Display> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: fmt::Debug> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Redact a byte slice, showing only its length.
pub struct RedactedBytes<'a>(pub &'a [u8]);

impl<'a> fmt::Display for RedactedBytes<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} bytes]", self.0.len())
    }
}

impl<'a> fmt::Debug for RedactedBytes<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Short hex fingerprint of public-key bytes, safe for log fields.
///
/// Public keys are not secret, but full keys clutter logs; eight hex
/// characters are enough to correlate sessions.
pub fn key_fingerprint(bytes: &[u8]) -> String {
    let take = bytes.len().min(4);
    hex::encode(&bytes[..take])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_display() {
        assert_eq!(format!("{}", Redacted("secret key bytes")), "[REDACTED]");
        assert_eq!(format!("{:?}", Redacted([1u8, 2, 3])), "[REDACTED]");
    }

    #[test]
    fn test_redacted_bytes_shows_length_only() {
        let data = [0xAAu8; 32];
        assert_eq!(format!("{}", RedactedBytes(&data)), "[32 bytes]");
    }

    #[test]
    fn test_key_fingerprint() {
        assert_eq!(key_fingerprint(&[0xDE, 0xAD, 0xBE, 0xEF, 0x01]), "deadbeef");
        assert_eq!(key_fingerprint(&[0x0F]), "0f");
        assert_eq!(key_fingerprint(&[]), "");
    }
}
