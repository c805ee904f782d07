//! Negotiation message schema and the signaling collaborator.
//!
//! Negotiation messages travel over an external signaling transport
//! before any direct session exists. Offers and answers are tagged by a
//! `type` field and carry the sender's public key; connectivity
//! candidates are distinguished by the absence of `type`.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Whether a session description is an offer or an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionKind {
    /// Initiating side's description.
    Offer,
    /// Responding side's description.
    Answer,
}

/// An offer or answer: opaque SDP blob plus the sender's public key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Message kind, serialized as the `type` field.
    #[serde(rename = "type")]
    pub kind: DescriptionKind,
    /// Opaque session-description blob, applied verbatim to the transport.
    pub sdp: String,
    /// Sender's exported public key (base64 of the raw 32 bytes).
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// A connectivity candidate, forwarded verbatim to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateInit {
    /// The candidate line.
    pub candidate: String,
    /// Media stream identification tag, if the transport provided one.
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    /// Index of the media description the candidate belongs to.
    #[serde(rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u32>,
}

/// A message exchanged over the signaling transport.
///
/// Untagged on the wire: descriptions match on `type`/`sdp`/`publicKey`,
/// candidates on the `candidate` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NegotiationMessage {
    /// Offer or answer with key material.
    Description(SessionDescription),
    /// Connectivity candidate.
    Candidate(CandidateInit),
}

impl NegotiationMessage {
    /// Build an offer message.
    pub fn offer(sdp: String, public_key: String) -> Self {
        Self::Description(SessionDescription {
            kind: DescriptionKind::Offer,
            sdp,
            public_key,
        })
    }

    /// Build an answer message.
    pub fn answer(sdp: String, public_key: String) -> Self {
        Self::Description(SessionDescription {
            kind: DescriptionKind::Answer,
            sdp,
            public_key,
        })
    }

    /// Serialize to the wire JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Encoding(e.to_string()))
    }

    /// Parse from the wire JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Encoding(e.to_string()))
    }
}

/// The external signaling transport.
///
/// Delivery must preserve arrival order per logical call; offer/answer
/// application is not idempotent with respect to state transitions.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Send a negotiation message to the peer.
    async fn send(&self, message: NegotiationMessage) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_wire_shape() {
        let msg = NegotiationMessage::offer("v=0 fake sdp".into(), "cHVibGljLWtleQ==".into());
        let json = msg.to_json().expect("serialize");

        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["type"], "offer");
        assert_eq!(value["sdp"], "v=0 fake sdp");
        assert_eq!(value["publicKey"], "cHVibGljLWtleQ==");
    }

    #[test]
    fn test_answer_roundtrip() {
        let msg = NegotiationMessage::answer("sdp".into(), "a2V5".into());
        let parsed = NegotiationMessage::from_json(&msg.to_json().expect("serialize"))
            .expect("deserialize");
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_candidate_has_no_type_field() {
        let msg = NegotiationMessage::Candidate(CandidateInit {
            candidate: "candidate:0 1 UDP 2122252543 192.0.2.1 54321 typ host".into(),
            sdp_mid: Some("0".into()),
            sdp_mline_index: Some(0),
        });
        let json = msg.to_json().expect("serialize");

        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert!(value.get("type").is_none());
        assert_eq!(value["sdpMid"], "0");
        assert_eq!(value["sdpMLineIndex"], 0);

        match NegotiationMessage::from_json(&json).expect("deserialize") {
            NegotiationMessage::Candidate(c) => {
                assert_eq!(c.sdp_mline_index, Some(0));
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn test_candidate_without_optional_fields() {
        let json = r#"{"candidate":"candidate:1 1 UDP 1 198.51.100.2 9 typ host"}"#;
        match NegotiationMessage::from_json(json).expect("deserialize") {
            NegotiationMessage::Candidate(c) => {
                assert!(c.sdp_mid.is_none());
                assert!(c.sdp_mline_index.is_none());
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            NegotiationMessage::from_json("{\"unrelated\":true}"),
            Err(Error::Encoding(_))
        ));
    }
}
