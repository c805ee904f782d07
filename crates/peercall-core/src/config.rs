//! Call configuration.

use serde::{Deserialize, Serialize};

/// Default chunk size for file transfer frames (16 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Configuration for a call attempt.
///
/// The defaults reproduce the stock setup: a public STUN server and one
/// data channel each for chat and file transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// ICE server URLs handed to the transport factory.
    pub ice_servers: Vec<String>,
    /// Label of the encrypted chat data channel.
    pub chat_channel_label: String,
    /// Label of the file transfer data channel.
    pub file_channel_label: String,
    /// File chunk size in bytes. The last chunk may be shorter.
    pub chunk_size: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            chat_channel_label: "chatChannel".to_string(),
            file_channel_label: "fileChannel".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CallConfig::default();
        assert_eq!(config.chunk_size, 16384);
        assert_eq!(config.chat_channel_label, "chatChannel");
        assert_eq!(config.file_channel_label, "fileChannel");
        assert_eq!(config.ice_servers.len(), 1);
    }
}
