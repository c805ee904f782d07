//! Peer session lifecycle and negotiation state machine.
//!
//! A [`PeerSession`] is the unit of a single call attempt. All protocol
//! logic is driven through [`PeerSession::handle`] with a
//! [`SessionEvent`]; the session owns its transport handle and shared
//! secret exclusively and is the only writer of either.
//!
//! Events for a session must be processed in arrival order; offer and
//! answer application is not idempotent with respect to state
//! transitions. The session itself is single-writer: `handle` takes
//! `&mut self`, so no event can interleave with another mid-transition.

use crate::chat::ChatProtocol;
use crate::config::CallConfig;
use crate::crypto::{ClientKeypair, PeerPublicKey, SessionSecret};
use crate::error::{Error, Result};
use crate::logging::{key_fingerprint, RedactedBytes};
use crate::signaling::{
    CandidateInit, DescriptionKind, NegotiationMessage, SessionDescription, SignalingChannel,
};
use crate::transfer::{self, FileReceiver};
use crate::transport::{
    DataChannel, DisplaySink, MediaSource, SessionTransport, TransportEvent, TransportFactory,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle state of a peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No negotiation in progress.
    New,
    /// Local offer sent, waiting for the peer's answer.
    Offering,
    /// Remote offer applied and answer emitted, waiting for the
    /// transport to come up.
    Answering,
    /// Transport session established.
    Connected,
    /// Torn down; equivalent to `New` for a future call.
    Closed,
}

/// An event driving the state machine.
#[derive(Debug)]
pub enum SessionEvent {
    /// Local side initiates a call.
    StartCall,
    /// A negotiation message arrived over signaling.
    Signal(NegotiationMessage),
    /// The transport session surfaced an event.
    Transport(TransportEvent),
    /// Explicit local hang-up.
    HangUp,
}

/// A single call attempt between two endpoints.
pub struct PeerSession {
    state: SessionState,
    config: CallConfig,
    keypair: Arc<ClientKeypair>,
    remote_key: Option<PeerPublicKey>,
    secret: Option<SessionSecret>,
    transport: Option<Box<dyn SessionTransport>>,
    chat_channel: Option<Box<dyn DataChannel>>,
    file_channel: Option<Box<dyn DataChannel>>,
    chat: ChatProtocol,
    files: FileReceiver,
    signaling: Arc<dyn SignalingChannel>,
    factory: Arc<dyn TransportFactory>,
    media: Option<Arc<dyn MediaSource>>,
    display: Arc<dyn DisplaySink>,
}

impl PeerSession {
    /// Create a session in the `New` state.
    ///
    /// The keypair is the client-wide identity, generated once at
    /// startup and shared across sessions.
    pub fn new(
        config: CallConfig,
        keypair: Arc<ClientKeypair>,
        signaling: Arc<dyn SignalingChannel>,
        factory: Arc<dyn TransportFactory>,
        media: Option<Arc<dyn MediaSource>>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            state: SessionState::New,
            config,
            keypair,
            remote_key: None,
            secret: None,
            transport: None,
            chat_channel: None,
            file_channel: None,
            chat: ChatProtocol::new(),
            files: FileReceiver::new(),
            signaling,
            factory,
            media,
            display,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a shared secret is currently derived.
    pub fn is_secure(&self) -> bool {
        self.secret.is_some()
    }

    /// Inbound chat frames dropped because they failed to decrypt.
    pub fn decrypt_failures(&self) -> u64 {
        self.chat.decrypt_failures()
    }

    /// Process one event.
    pub async fn handle(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::StartCall => self.start_call().await,
            SessionEvent::Signal(NegotiationMessage::Description(desc)) => match desc.kind {
                DescriptionKind::Offer => self.on_offer(desc).await,
                DescriptionKind::Answer => self.on_answer(desc).await,
            },
            SessionEvent::Signal(NegotiationMessage::Candidate(candidate)) => {
                self.on_candidate(candidate).await
            }
            SessionEvent::Transport(event) => self.on_transport(event).await,
            SessionEvent::HangUp => {
                self.close().await;
                Ok(())
            }
        }
    }

    /// Encrypt and send a chat message over the established channel.
    pub async fn send_chat(&mut self, text: &str) -> Result<()> {
        let Some(secret) = self.secret.as_ref() else {
            return Err(Error::Encryption("no shared secret established".into()));
        };
        let Some(channel) = self.chat_channel.as_deref() else {
            return Err(Error::Transport("chat channel not open".into()));
        };
        if !channel.is_open() {
            return Err(Error::Transport("chat channel not open".into()));
        }
        self.chat
            .send(secret, channel, self.display.as_ref(), text)
            .await
    }

    /// Stream a file to the peer over the dedicated file channel.
    pub async fn send_file(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let Some(channel) = self.file_channel.as_deref() else {
            return Err(Error::Transport("file channel not open".into()));
        };
        transfer::send_file(
            channel,
            self.display.as_ref(),
            name,
            bytes,
            self.config.chunk_size,
        )
        .await
    }

    /// `New -> Offering`: create a transport session, attach media and
    /// outbound channels, and emit an offer carrying our public key.
    async fn start_call(&mut self) -> Result<()> {
        // A new call for the same logical session tears down any prior
        // transport handle first.
        if self.transport.is_some() {
            self.close().await;
        }

        let mut transport = self.factory.create(&self.config).await?;
        if let Some(media) = &self.media {
            transport.attach_media(media.local_stream()?)?;
        }
        self.chat_channel = Some(transport.create_data_channel(&self.config.chat_channel_label)?);
        self.file_channel = Some(transport.create_data_channel(&self.config.file_channel_label)?);

        let sdp = transport.create_offer().await?;
        transport
            .set_local_description(DescriptionKind::Offer, &sdp)
            .await?;
        self.transport = Some(transport);
        self.state = SessionState::Offering;
        info!(sdp = %RedactedBytes(sdp.as_bytes()), "local offer created");

        self.signaling
            .send(NegotiationMessage::offer(
                sdp,
                self.keypair.public_key().to_base64(),
            ))
            .await
    }

    /// `New/Offering -> Answering`: apply a remote offer and emit an
    /// answer carrying our public key.
    async fn on_offer(&mut self, desc: SessionDescription) -> Result<()> {
        if self.state == SessionState::Offering && self.yield_on_glare(&desc).await? {
            return Ok(());
        }

        self.secure_with(&desc.public_key);

        if self.transport.is_none() {
            let mut transport = self.factory.create(&self.config).await?;
            if let Some(media) = &self.media {
                transport.attach_media(media.local_stream()?)?;
            }
            self.transport = Some(transport);
        }

        let answer = match self.apply_offer_and_answer(&desc.sdp).await {
            Ok(answer) => answer,
            Err(e) => {
                // Offer application failures abort the session; the
                // user has to retry the call.
                warn!(error = %e, "remote offer rejected, closing session");
                self.close().await;
                return Err(e);
            }
        };

        self.state = SessionState::Answering;
        info!(sdp = %RedactedBytes(desc.sdp.as_bytes()), "remote offer applied, answer created");

        self.signaling
            .send(NegotiationMessage::answer(
                answer,
                self.keypair.public_key().to_base64(),
            ))
            .await
    }

    /// `Offering -> Connected`: apply the peer's answer.
    async fn on_answer(&mut self, desc: SessionDescription) -> Result<()> {
        if self.state != SessionState::Offering {
            warn!(state = ?self.state, "unexpected answer ignored");
            return Ok(());
        }

        self.secure_with(&desc.public_key);

        let Some(transport) = self.transport.as_mut() else {
            return Err(Error::NegotiationApply("no transport session".into()));
        };
        if let Err(e) = transport
            .set_remote_description(DescriptionKind::Answer, &desc.sdp)
            .await
        {
            warn!(error = %e, "remote answer rejected, closing session");
            self.close().await;
            return Err(e);
        }

        self.state = SessionState::Connected;
        info!(secure = self.is_secure(), "session connected");
        Ok(())
    }

    /// Forward a candidate to the transport. Candidates may arrive
    /// before a transport session exists (dropped; the peer's ICE layer
    /// re-trickles) or turn out stale (logged, never fatal).
    async fn on_candidate(&mut self, candidate: CandidateInit) -> Result<()> {
        let Some(transport) = self.transport.as_mut() else {
            warn!("candidate dropped, no transport session yet");
            return Ok(());
        };
        if let Err(e) = transport.add_ice_candidate(&candidate).await {
            warn!(error = %e, "candidate rejected by transport");
        }
        Ok(())
    }

    async fn on_transport(&mut self, event: TransportEvent) -> Result<()> {
        match event {
            TransportEvent::IceCandidate(candidate) => {
                self.signaling
                    .send(NegotiationMessage::Candidate(candidate))
                    .await
            }
            TransportEvent::DataChannelOpen(channel) => {
                let label = channel.label().to_string();
                if label == self.config.chat_channel_label {
                    self.chat_channel = Some(channel);
                } else if label == self.config.file_channel_label {
                    self.file_channel = Some(channel);
                } else {
                    debug!(%label, "unknown data channel ignored");
                    return Ok(());
                }
                debug!(%label, "data channel open");
                if self.state == SessionState::Answering {
                    self.state = SessionState::Connected;
                    info!(secure = self.is_secure(), "session connected");
                }
                Ok(())
            }
            TransportEvent::ChannelMessage { label, data } => {
                if self.state == SessionState::Closed {
                    // A frame from an already-closed transport; discard
                    // rather than mutate a stale session.
                    debug!(%label, "frame after close discarded");
                    return Ok(());
                }
                if label == self.config.chat_channel_label {
                    self.chat
                        .on_receive(self.secret.as_ref(), self.display.as_ref(), &data);
                    Ok(())
                } else if label == self.config.file_channel_label {
                    self.files.handle_frame(&data, self.display.as_ref())
                } else {
                    debug!(%label, len = data.len(), "frame on unknown channel ignored");
                    Ok(())
                }
            }
            TransportEvent::Closed => {
                self.close().await;
                Ok(())
            }
        }
    }

    /// Glare arbitration: both sides offered simultaneously. The peer
    /// with the bytewise smaller public key yields its own offer and
    /// answers the remote one; the other ignores the incoming offer.
    /// Deterministic, so both sides agree without an extra round trip.
    ///
    /// Returns `true` if the incoming offer should be ignored.
    async fn yield_on_glare(&mut self, desc: &SessionDescription) -> Result<bool> {
        let Ok(remote) = PeerPublicKey::from_base64(&desc.public_key) else {
            // Unparseable key; let the normal offer path deal with it.
            return Ok(false);
        };
        if self.keypair.public_key().as_bytes() >= remote.as_bytes() {
            info!("simultaneous offers, keeping local offer");
            return Ok(true);
        }

        info!("simultaneous offers, yielding to peer");
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.chat_channel = None;
        self.file_channel = None;
        self.state = SessionState::New;
        Ok(false)
    }

    /// Import the peer's public key and derive the shared secret.
    ///
    /// Failure leaves the session without a secret (unusable for chat
    /// and file transfer until a later negotiation round succeeds) but
    /// never aborts the state machine.
    fn secure_with(&mut self, encoded_key: &str) {
        let derived = PeerPublicKey::from_base64(encoded_key)
            .and_then(|key| self.keypair.derive(&key).map(|secret| (key, secret)));
        match derived {
            Ok((key, secret)) => {
                debug!(
                    peer = %key_fingerprint(key.as_bytes()),
                    "shared secret derived"
                );
                self.remote_key = Some(key);
                self.secret = Some(secret);
                self.display.show_secure_status(true);
            }
            Err(e) => {
                warn!(error = %e, "key derivation failed, session stays unsecured");
                self.remote_key = None;
                self.secret = None;
                self.display.show_secure_status(false);
            }
        }
    }

    /// Apply a remote offer and produce our local answer SDP.
    async fn apply_offer_and_answer(&mut self, sdp: &str) -> Result<String> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(Error::NegotiationApply("no transport session".into()));
        };
        transport
            .set_remote_description(DescriptionKind::Offer, sdp)
            .await?;
        let answer = transport.create_answer().await?;
        transport
            .set_local_description(DescriptionKind::Answer, &answer)
            .await?;
        Ok(answer)
    }

    /// `any -> Closed`: release the transport handle and clear all
    /// cryptographic material. The session is afterwards equivalent to
    /// `New` for a future call.
    async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.chat_channel = None;
        self.file_channel = None;
        self.secret = None; // zeroized on drop
        self.remote_key = None;
        self.files.reset();
        self.state = SessionState::Closed;
        self.display.show_secure_status(false);
        info!("session closed");
    }
}

impl std::fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSession")
            .field("state", &self.state)
            .field("secure", &self.is_secure())
            .field("has_transport", &self.transport.is_some())
            .finish()
    }
}
