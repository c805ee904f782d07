//! Encrypted chat over the established secure channel.
//!
//! Thin layer: seal on send, open on receive, delegate display. A frame
//! that fails to open is dropped without alerting; stray unencrypted
//! control traffic may legitimately share the channel.

use crate::crypto::{self, SessionSecret};
use crate::error::Result;
use crate::logging::Redacted;
use crate::transport::{DataChannel, DisplaySink};
use tracing::debug;

/// Chat protocol state for one session.
#[derive(Default)]
pub struct ChatProtocol {
    decrypt_failures: u64,
}

impl ChatProtocol {
    /// Create a fresh chat layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt and transmit a text message, echoing it locally on success.
    pub async fn send(
        &self,
        secret: &SessionSecret,
        channel: &dyn DataChannel,
        display: &dyn DisplaySink,
        text: &str,
    ) -> Result<()> {
        let framed = crypto::seal(secret, text.as_bytes())?;
        channel.send(&framed).await?;
        display.show_message(text);
        debug!(message = %Redacted(text), len = framed.len(), "chat message sent");
        Ok(())
    }

    /// Handle an inbound chat frame.
    ///
    /// Frames that do not decrypt, or that arrive before a secret is
    /// derived, are silently discarded.
    pub fn on_receive(
        &mut self,
        secret: Option<&SessionSecret>,
        display: &dyn DisplaySink,
        frame: &[u8],
    ) {
        let Some(secret) = secret else {
            self.decrypt_failures += 1;
            debug!(len = frame.len(), "chat frame dropped, no shared secret");
            return;
        };

        match crypto::open(secret, frame) {
            Ok(plaintext) => match String::from_utf8(plaintext) {
                Ok(text) => display.show_message(&text),
                Err(_) => {
                    self.decrypt_failures += 1;
                    debug!("chat frame dropped, payload not UTF-8");
                }
            },
            Err(_) => {
                self.decrypt_failures += 1;
                debug!(
                    failures = self.decrypt_failures,
                    "chat frame dropped, decryption failed"
                );
            }
        }
    }

    /// Number of inbound frames dropped so far.
    pub fn decrypt_failures(&self) -> u64 {
        self.decrypt_failures
    }
}
