//! Protocol and messaging collaborator seams
//!
//! The signing/messaging library owns key management, Nostr event
//! construction and wallet-connect semantics. From this core's perspective
//! it does two things: turn a structurally valid deep link into an
//! authentication-init request, and send that request. Both live behind
//! traits so the pipeline is testable without the real library.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::utils::deep_link::DeepLink;

/// The deep link was not a recognized protocol request
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Structurally fine but not an auth-init URL this protocol version knows
    Unrecognized,
    /// Malformed content inside the link (bad encoding, missing fields)
    Malformed(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized => write!(f, "Not a recognized auth-init URL"),
            Self::Malformed(msg) => write!(f, "Malformed auth-init URL: {}", msg),
        }
    }
}

/// Sending through the messaging collaborator failed
#[derive(Debug, Clone, PartialEq)]
pub enum MessengerError {
    /// Collaborator not ready (no relay connection, no signer attached)
    NotReady,
    /// Send was attempted and failed
    Send(String),
}

impl fmt::Display for MessengerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "Messaging collaborator not ready"),
            Self::Send(msg) => write!(f, "Failed to send auth-init request: {}", msg),
        }
    }
}

/// A parsed authentication/activation request extracted from a deep link.
/// The interesting protocol fields stay opaque in `params`; the core only
/// routes the request, it never interprets it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthInitRequest {
    /// Leading path segment of the originating link ("pay", "verify", ...)
    pub intent: String,
    /// Parameters the parser extracted for the messaging layer
    pub params: HashMap<String, String>,
    /// The raw URL the request came from
    pub source_url: String,
}

/// Parses activation URLs into protocol requests. Allowed to reject.
#[async_trait]
pub trait ProtocolParser: Send + Sync {
    async fn parse_auth_init(&self, link: &DeepLink) -> Result<AuthInitRequest, ParseError>;
}

/// Forwards parsed requests to the protocol library. Fire-and-forget from
/// the core's perspective; business-level failures come back asynchronously
/// through the operation registry, not through this call.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_auth_init(&self, request: AuthInitRequest) -> Result<(), MessengerError>;
}
