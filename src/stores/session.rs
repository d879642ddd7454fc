//! Session store - onboarding and credential-presence state
//!
//! The signing library owns the actual key material; this store only tracks
//! whether onboarding finished and whether credential material exists, the
//! two flags the navigation coordinator gates on. Both are loaded from the
//! durable store once at startup and written through on change.

use std::sync::{Arc, Mutex, PoisonError};

use crate::services::storage::KeyValueStore;

const STORAGE_KEY_ONBOARDED: &str = "ticketflow_onboarding_complete";
const STORAGE_KEY_NPUB: &str = "ticketflow_npub";

#[derive(Clone, Debug, Default, PartialEq)]
struct SessionState {
    onboarding_complete: bool,
    /// Public key marker for the externally-held credential; presence is all
    /// the core cares about
    pubkey: Option<String>,
}

pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    state: Mutex<SessionState>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Load persisted flags. Storage failures leave the defaults in place
    /// (un-onboarded, no credentials) - the safe landing surfaces.
    pub async fn load(&self) {
        log::info!("Loading session state...");

        let onboarding_complete = match self.store.get(STORAGE_KEY_ONBOARDED).await {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                log::warn!("Failed to read onboarding flag: {}", e);
                false
            }
        };
        let pubkey = match self.store.get(STORAGE_KEY_NPUB).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to read stored pubkey: {}", e);
                None
            }
        };

        if pubkey.is_some() {
            log::info!("Found stored session");
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = SessionState {
            onboarding_complete,
            pubkey,
        };
    }

    pub fn onboarding_complete(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .onboarding_complete
    }

    pub fn has_credentials(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pubkey
            .is_some()
    }

    pub fn pubkey(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pubkey
            .clone()
    }

    /// Mark onboarding finished (or reset it). Write-through; a storage
    /// failure is logged and the in-memory flag still flips.
    pub async fn set_onboarding_complete(&self, complete: bool) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.onboarding_complete = complete;
        }
        let value = if complete { "true" } else { "false" };
        if let Err(e) = self.store.set(STORAGE_KEY_ONBOARDED, value).await {
            log::warn!("Failed to persist onboarding flag: {}", e);
        }
    }

    /// Record that credential material now exists (the signing library
    /// reported a pubkey), or remove the marker on logout.
    pub async fn set_pubkey(&self, pubkey: Option<&str>) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.pubkey = pubkey.map(str::to_string);
        }
        let result = match pubkey {
            Some(pk) => self.store.set(STORAGE_KEY_NPUB, pk).await,
            None => self.store.delete(STORAGE_KEY_NPUB).await,
        };
        if let Err(e) = result {
            log::warn!("Failed to persist pubkey marker: {}", e);
        }
    }
}
