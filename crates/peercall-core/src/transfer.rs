//! Chunked file transfer over a dedicated data channel.
//!
//! The sender announces a transfer with a single UTF-8 metadata frame,
//! `FILE_METADATA:` followed by a JSON `{name, size}` object, then
//! streams the payload as raw binary chunks in strict order. The
//! receiver accumulates chunks and detects completion by byte count.
//! There is no per-chunk acknowledgment; flow control is the transport's
//! backpressure on `send`.
//!
//! One inbound transfer at a time: a second metadata frame resets any
//! transfer still in progress. The wire format carries no transfer
//! identifier, so there is nothing to key concurrent transfers by.

use crate::error::{Error, Result};
use crate::transport::{DataChannel, DisplaySink};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Literal prefix of the metadata frame.
pub const METADATA_PREFIX: &str = "FILE_METADATA:";

/// Metadata announced before the chunk stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Original file name.
    pub name: String,
    /// Total payload size in bytes.
    pub size: u64,
}

impl FileMetadata {
    /// Encode as the wire metadata frame.
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_string(self).map_err(|e| Error::Encoding(e.to_string()))?;
        let mut frame = METADATA_PREFIX.as_bytes().to_vec();
        frame.extend_from_slice(json.as_bytes());
        Ok(frame)
    }
}

/// Try to interpret a frame as a metadata announcement.
///
/// Returns `None` for anything that does not carry the metadata prefix
/// (i.e. a binary chunk), `Some(Err)` for a prefixed frame whose JSON
/// body is malformed.
fn parse_metadata(frame: &[u8]) -> Option<Result<FileMetadata>> {
    let text = std::str::from_utf8(frame).ok()?;
    let body = text.strip_prefix(METADATA_PREFIX)?;
    Some(serde_json::from_str(body).map_err(|e| Error::Encoding(e.to_string())))
}

/// Split a payload into chunks and stream it over the file channel.
///
/// Sends the metadata frame first, then the chunks in order, reporting
/// progress to the display after each chunk. Awaiting each `send` is
/// the only flow control; the transport's backpressure paces us.
pub async fn send_file(
    channel: &dyn DataChannel,
    display: &dyn DisplaySink,
    name: &str,
    bytes: &[u8],
    chunk_size: usize,
) -> Result<()> {
    if !channel.is_open() {
        return Err(Error::Transport("file channel not open".into()));
    }

    let metadata = FileMetadata {
        name: name.to_string(),
        size: bytes.len() as u64,
    };
    channel.send(&metadata.to_frame()?).await?;

    let mut sent: u64 = 0;
    for chunk in bytes.chunks(chunk_size.max(1)) {
        channel.send(chunk).await?;
        sent += chunk.len() as u64;
        display.show_transfer_progress(name, sent, metadata.size);
    }

    info!(name, size = metadata.size, "file sent");
    Ok(())
}

/// An inbound transfer being reassembled.
struct InboundTransfer {
    metadata: FileMetadata,
    received: u64,
    chunks: Vec<Vec<u8>>,
}

/// Receiver side of the file protocol.
///
/// Owns at most one in-progress transfer; all mutation happens on the
/// single event-processing path.
#[derive(Default)]
pub struct FileReceiver {
    active: Option<InboundTransfer>,
}

impl FileReceiver {
    /// Create a receiver with no transfer in progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transfer is currently being reassembled.
    pub fn in_progress(&self) -> bool {
        self.active.is_some()
    }

    /// Discard any in-progress transfer.
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Process one frame from the file channel.
    ///
    /// Metadata frames start (or restart) a transfer; binary frames are
    /// appended in arrival order. On completion the reassembled bytes
    /// are handed to the display's download path and the slot clears.
    /// A chunk with no active transfer is rejected with
    /// [`Error::TransferIntegrity`].
    pub fn handle_frame(&mut self, frame: &[u8], display: &dyn DisplaySink) -> Result<()> {
        if let Some(parsed) = parse_metadata(frame) {
            let metadata = parsed?;
            if self.active.is_some() {
                warn!(
                    name = %metadata.name,
                    "new metadata while a transfer was in progress, resetting"
                );
            }
            info!(name = %metadata.name, size = metadata.size, "inbound file transfer started");
            display.show_transfer_progress(&metadata.name, 0, metadata.size);
            self.active = Some(InboundTransfer {
                metadata,
                received: 0,
                chunks: Vec::new(),
            });
            self.maybe_complete(display);
            return Ok(());
        }

        let Some(transfer) = self.active.as_mut() else {
            return Err(Error::TransferIntegrity(
                "chunk received with no active transfer".into(),
            ));
        };

        transfer.received += frame.len() as u64;
        transfer.chunks.push(frame.to_vec());
        debug!(
            name = %transfer.metadata.name,
            received = transfer.received,
            total = transfer.metadata.size,
            "chunk received"
        );
        display.show_transfer_progress(
            &transfer.metadata.name,
            transfer.received,
            transfer.metadata.size,
        );

        self.maybe_complete(display);
        Ok(())
    }

    /// Hand off and clear the slot once the declared byte count arrived.
    fn maybe_complete(&mut self, display: &dyn DisplaySink) {
        let done = self
            .active
            .as_ref()
            .is_some_and(|t| t.received >= t.metadata.size);
        if !done {
            return;
        }
        if let Some(transfer) = self.active.take() {
            let bytes = transfer.chunks.concat();
            info!(
                name = %transfer.metadata.name,
                size = bytes.len(),
                "inbound file transfer complete"
            );
            display.offer_download(&transfer.metadata.name, bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDisplay {
        progress: Mutex<Vec<(String, u64, u64)>>,
        downloads: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl DisplaySink for RecordingDisplay {
        fn show_message(&self, _: &str) {}
        fn show_transfer_progress(&self, name: &str, received: u64, total: u64) {
            self.progress
                .lock()
                .unwrap()
                .push((name.to_string(), received, total));
        }
        fn offer_download(&self, name: &str, bytes: Vec<u8>) {
            self.downloads
                .lock()
                .unwrap()
                .push((name.to_string(), bytes));
        }
        fn show_secure_status(&self, _: bool) {}
    }

    #[derive(Default)]
    struct RecordingChannel {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl DataChannel for RecordingChannel {
        async fn send(&self, data: &[u8]) -> crate::error::Result<()> {
            self.frames.lock().unwrap().push(data.to_vec());
            Ok(())
        }
        fn is_open(&self) -> bool {
            true
        }
        fn label(&self) -> &str {
            "fileChannel"
        }
    }

    fn metadata_frame(name: &str, size: u64) -> Vec<u8> {
        FileMetadata {
            name: name.to_string(),
            size,
        }
        .to_frame()
        .expect("encode metadata")
    }

    #[test]
    fn test_metadata_frame_format() {
        let frame = metadata_frame("a.txt", 10);
        let text = std::str::from_utf8(&frame).expect("utf8");
        assert!(text.starts_with("FILE_METADATA:"));
        let body: serde_json::Value =
            serde_json::from_str(text.strip_prefix("FILE_METADATA:").unwrap()).expect("json");
        assert_eq!(body["name"], "a.txt");
        assert_eq!(body["size"], 10);
    }

    #[test]
    fn test_reassembly_and_single_handoff() {
        let mut receiver = FileReceiver::new();
        let display = RecordingDisplay::default();

        receiver
            .handle_frame(&metadata_frame("a.txt", 10), &display)
            .expect("metadata");
        receiver
            .handle_frame(b"abcdef", &display)
            .expect("chunk 1");
        receiver.handle_frame(b"ghij", &display).expect("chunk 2");

        let downloads = display.downloads.lock().unwrap();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].0, "a.txt");
        assert_eq!(downloads[0].1, b"abcdefghij");
        assert!(!receiver.in_progress());
    }

    #[test]
    fn test_spurious_chunk_after_completion_rejected() {
        let mut receiver = FileReceiver::new();
        let display = RecordingDisplay::default();

        receiver
            .handle_frame(&metadata_frame("a.txt", 4), &display)
            .expect("metadata");
        receiver.handle_frame(b"abcd", &display).expect("chunk");
        assert_eq!(display.downloads.lock().unwrap().len(), 1);

        // Transfer slot is clear; a late chunk must not restart it.
        let err = receiver.handle_frame(b"late", &display).unwrap_err();
        assert!(matches!(err, Error::TransferIntegrity(_)));
        assert_eq!(display.downloads.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_chunk_without_metadata_rejected() {
        let mut receiver = FileReceiver::new();
        let display = RecordingDisplay::default();

        let err = receiver.handle_frame(b"orphan chunk", &display).unwrap_err();
        assert!(matches!(err, Error::TransferIntegrity(_)));
        assert!(display.downloads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_second_metadata_resets_in_progress_transfer() {
        let mut receiver = FileReceiver::new();
        let display = RecordingDisplay::default();

        receiver
            .handle_frame(&metadata_frame("first.bin", 100), &display)
            .expect("metadata 1");
        receiver.handle_frame(b"partial", &display).expect("chunk");

        receiver
            .handle_frame(&metadata_frame("second.bin", 3), &display)
            .expect("metadata 2");
        receiver.handle_frame(b"xyz", &display).expect("chunk");

        let downloads = display.downloads.lock().unwrap();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].0, "second.bin");
        assert_eq!(downloads[0].1, b"xyz");
    }

    #[test]
    fn test_zero_size_file_completes_on_metadata() {
        let mut receiver = FileReceiver::new();
        let display = RecordingDisplay::default();

        receiver
            .handle_frame(&metadata_frame("empty.txt", 0), &display)
            .expect("metadata");

        let downloads = display.downloads.lock().unwrap();
        assert_eq!(downloads.len(), 1);
        assert!(downloads[0].1.is_empty());
    }

    #[test]
    fn test_malformed_metadata_json_rejected() {
        let mut receiver = FileReceiver::new();
        let display = RecordingDisplay::default();

        let err = receiver
            .handle_frame(b"FILE_METADATA:{not json", &display)
            .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert!(!receiver.in_progress());
    }

    #[tokio::test]
    async fn test_send_file_chunks_in_order() {
        let channel = RecordingChannel::default();
        let display = RecordingDisplay::default();
        let payload: Vec<u8> = (0..10u8).collect();

        send_file(&channel, &display, "a.txt", &payload, 4)
            .await
            .expect("send");

        let frames = channel.frames.lock().unwrap();
        assert_eq!(frames.len(), 4); // metadata + 3 chunks
        assert!(frames[0].starts_with(b"FILE_METADATA:"));
        assert_eq!(frames[1], &payload[0..4]);
        assert_eq!(frames[2], &payload[4..8]);
        assert_eq!(frames[3], &payload[8..10]);

        // Sender-side progress after every chunk.
        let progress = display.progress.lock().unwrap();
        assert_eq!(
            *progress,
            vec![
                ("a.txt".to_string(), 4, 10),
                ("a.txt".to_string(), 8, 10),
                ("a.txt".to_string(), 10, 10),
            ]
        );
    }
}
