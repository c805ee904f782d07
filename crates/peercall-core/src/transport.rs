//! External collaborator interfaces.
//!
//! The underlying point-to-point transport (an ICE/DTLS-negotiated
//! session in practice), local media acquisition, and the display layer
//! are all external to this crate. The traits here are the seams a
//! front-end implements; the session state machine only ever talks to
//! these.
//!
//! Data channels are assumed to deliver messages in send order once
//! open; chat decryption and file reassembly depend on that and do not
//! resequence.

use crate::config::CallConfig;
use crate::error::Result;
use crate::signaling::{CandidateInit, DescriptionKind};
use async_trait::async_trait;
use std::fmt;

/// Opaque handle to a local media stream (camera or screen share).
///
/// Acquisition and rendering live entirely in the front-end; the state
/// machine only attaches the handle to a new transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHandle(pub u64);

/// An open data channel on the transport session.
#[async_trait]
pub trait DataChannel: Send + Sync {
    /// Send one message frame.
    ///
    /// Completion may be delayed by transport backpressure; callers
    /// awaiting this is the only flow control the file protocol uses.
    async fn send(&self, data: &[u8]) -> Result<()>;

    /// Whether the channel is currently open for sending.
    fn is_open(&self) -> bool;

    /// The channel's label.
    fn label(&self) -> &str;
}

/// The underlying connection-oriented transport session.
///
/// Exclusively owned by one `PeerSession`; closing the session
/// transitively closes it.
#[async_trait]
pub trait SessionTransport: Send {
    /// Create an offer description for the local side.
    async fn create_offer(&mut self) -> Result<String>;

    /// Create an answer description after a remote offer was applied.
    async fn create_answer(&mut self) -> Result<String>;

    /// Apply a locally created description.
    async fn set_local_description(&mut self, kind: DescriptionKind, sdp: &str) -> Result<()>;

    /// Apply the peer's description.
    async fn set_remote_description(&mut self, kind: DescriptionKind, sdp: &str) -> Result<()>;

    /// Forward a connectivity candidate received from the peer.
    ///
    /// May fail on stale or invalid candidates; such failures are
    /// logged by the caller and are never fatal to the session.
    async fn add_ice_candidate(&mut self, candidate: &CandidateInit) -> Result<()>;

    /// Attach a local outbound media stream.
    fn attach_media(&mut self, stream: StreamHandle) -> Result<()>;

    /// Open an outbound data channel with the given label.
    fn create_data_channel(&mut self, label: &str) -> Result<Box<dyn DataChannel>>;

    /// Tear the session down and release all channels.
    async fn close(&mut self);
}

/// Creates a fresh transport session per call attempt.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Create a transport session configured with the given ICE servers.
    async fn create(&self, config: &CallConfig) -> Result<Box<dyn SessionTransport>>;
}

/// Source of local outbound media.
pub trait MediaSource: Send + Sync {
    /// Handle to the current local stream.
    fn local_stream(&self) -> Result<StreamHandle>;
}

/// Display/UI collaborator.
pub trait DisplaySink: Send + Sync {
    /// Show a chat message (local echo or decrypted remote text).
    fn show_message(&self, text: &str);

    /// Report file transfer progress, send- or receive-side.
    fn show_transfer_progress(&self, name: &str, received: u64, total: u64);

    /// Hand a fully reassembled file to the download/persistence layer.
    fn offer_download(&self, name: &str, bytes: Vec<u8>);

    /// Report whether the session currently has a derived shared secret.
    fn show_secure_status(&self, secure: bool);
}

/// Events surfaced by the transport session to the state machine.
pub enum TransportEvent {
    /// The transport discovered a local connectivity candidate to relay
    /// to the peer via signaling.
    IceCandidate(CandidateInit),
    /// The peer opened a data channel towards us.
    DataChannelOpen(Box<dyn DataChannel>),
    /// A message frame arrived on a data channel.
    ChannelMessage {
        /// Label of the channel the frame arrived on.
        label: String,
        /// The raw frame.
        data: Vec<u8>,
    },
    /// The transport session closed.
    Closed,
}

impl fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IceCandidate(c) => f.debug_tuple("IceCandidate").field(c).finish(),
            Self::DataChannelOpen(ch) => {
                f.debug_tuple("DataChannelOpen").field(&ch.label()).finish()
            }
            Self::ChannelMessage { label, data } => f
                .debug_struct("ChannelMessage")
                .field("label", label)
                .field("len", &data.len())
                .finish(),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
