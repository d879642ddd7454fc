//! Shared mock collaborators for tests
//!
//! Recording doubles for the router, protocol parser, messenger and durable
//! store, so pipeline tests can assert on side effects without the real
//! signing/messaging library.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::services::protocol::{
    AuthInitRequest, Messenger, MessengerError, ParseError, ProtocolParser,
};
use crate::services::storage::{KeyValueStore, StorageError};
use crate::services::navigation::Router;
use crate::utils::deep_link::DeepLink;

/// Router double that records every call in order
pub(crate) struct RecordingRouter {
    calls: Mutex<Vec<String>>,
}

impl RecordingRouter {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("replace:"))
            .count()
    }
}

impl Router for RecordingRouter {
    fn replace(&self, path: &str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("replace:{}", path));
    }

    fn push(&self, path: &str, _params: &std::collections::HashMap<String, String>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("push:{}", path));
    }

    fn dismiss_all(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push("dismiss_all".to_string());
    }
}

/// Parser double: succeeds structurally (intent = first segment) unless told
/// to reject, and counts invocations for dedup assertions
pub(crate) struct ScriptedParser {
    reject: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedParser {
    pub(crate) fn accepting() -> Self {
        Self {
            reject: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn rejecting() -> Self {
        Self {
            reject: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn parse_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolParser for ScriptedParser {
    async fn parse_auth_init(&self, link: &DeepLink) -> Result<AuthInitRequest, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Err(ParseError::Unrecognized);
        }
        Ok(AuthInitRequest {
            intent: link.segments.first().cloned().unwrap_or_default(),
            params: link.query.clone(),
            source_url: link.url.clone(),
        })
    }
}

/// Messenger double recording every sent request
pub(crate) struct RecordingMessenger {
    sent: Mutex<Vec<AuthInitRequest>>,
    fail: AtomicBool,
}

impl RecordingMessenger {
    pub(crate) fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    pub(crate) fn sent(&self) -> Vec<AuthInitRequest> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_auth_init(&self, request: AuthInitRequest) -> Result<(), MessengerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MessengerError::NotReady);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        Ok(())
    }
}

/// Store double where every call fails, for persistence-error paths
pub(crate) struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Backend("store offline".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("store offline".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("store offline".to_string()))
    }
}
