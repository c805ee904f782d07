//! # peercall-core
//!
//! Session negotiation and secure-channel protocol for direct
//! peer-to-peer calls: the state machine that turns an exchange of
//! opaque negotiation messages into an established transport session,
//! X25519 key agreement deriving a shared symmetric key, authenticated
//! encryption framing for chat messages, and a chunked file-transfer
//! protocol on the same transport primitive.
//!
//! The relay carrying negotiation messages never sees content: chat is
//! end-to-end encrypted under a per-call derived secret, and media and
//! files flow over the direct transport session.
//!
//! This crate is a library consumed by a front-end. Media acquisition
//! and rendering, the ICE/DTLS transport itself, the signaling server,
//! and all display logic are external collaborators behind the traits
//! in [`transport`] and [`signaling`].
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │               front-end                   │
//! ├───────────────────────────────────────────┤
//! │   session (negotiation state machine)     │
//! ├─────────────┬─────────────────────────────┤
//! │    chat     │          transfer           │
//! ├─────────────┴─────────────────────────────┤
//! │        crypto (X25519 / AEAD)             │
//! └───────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod chat;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod session;
pub mod signaling;
pub mod transfer;
pub mod transport;

pub use config::CallConfig;
pub use error::{Error, Result};
pub use session::{PeerSession, SessionEvent, SessionState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
