//! Deep link ingestion and dispatch
//!
//! URL activations arrive from three channels: the durable pending slot left
//! over from a previous launch, the OS cold-start initial URL, and the live
//! activation event stream. All three funnel into [`DeepLinkManager::process_link`],
//! which dedups re-deliveries, short-circuits bare-scheme app opens, and
//! otherwise dispatches through the protocol collaborator. Every call
//! resolves to a navigation outcome; a stuck "processing" screen is the one
//! failure mode this pipeline is built to rule out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::services::navigation::{resolve_route, NavigationCoordinator, Route, RouteIntent};
use crate::services::protocol::{Messenger, ProtocolParser};
use crate::services::storage::PendingLinkStore;
use crate::stores::session::SessionStore;
use crate::utils::data_state::DataState;
use crate::utils::deep_link::{is_bare_scheme, normalize_link, parse_deep_link};

/// Handle for the live URL-activation drain task. Dropping it aborts the
/// task, so the subscription cannot outlive the scope that owns it.
pub struct UrlEventSubscription {
    handle: JoinHandle<()>,
}

impl Drop for UrlEventSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Coordinates deep-link ingestion across process lifetime.
///
/// Constructed once by the AppContext. The seen-link map grows for the
/// process lifetime and is never persisted; it exists purely to suppress OS
/// re-deliveries, not as business truth.
pub struct DeepLinkManager {
    /// Normalized URL -> moment it was last accepted for processing
    seen: Mutex<HashMap<String, Instant>>,
    dedup_cooldown: Duration,
    pending: PendingLinkStore,
    parser: Arc<dyn ProtocolParser>,
    messenger: Arc<dyn Messenger>,
    navigation: NavigationCoordinator,
    session: Arc<SessionStore>,
    /// The OS cold-start URL channel may fire at most once per process
    initial_url_consumed: AtomicBool,
    /// Backing state for the dispatch loading/skeleton surface
    dispatch_state: Mutex<DataState<Route>>,
}

impl DeepLinkManager {
    pub fn new(
        dedup_cooldown: Duration,
        pending: PendingLinkStore,
        parser: Arc<dyn ProtocolParser>,
        messenger: Arc<dyn Messenger>,
        navigation: NavigationCoordinator,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            dedup_cooldown,
            pending,
            parser,
            messenger,
            navigation,
            session,
            initial_url_consumed: AtomicBool::new(false),
            dispatch_state: Mutex::new(DataState::Pending),
        }
    }

    /// Current state of the dispatch surface, for the host's skeleton UI
    pub fn dispatch_state(&self) -> DataState<Route> {
        self.dispatch_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_dispatch_state(&self, state: DataState<Route>) {
        *self
            .dispatch_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Ingest one activation URL.
    ///
    /// Dedup keys on the normalized URL and the seen-map entry is written
    /// before the first await, so overlapping deliveries of the same link
    /// cannot both pass the window regardless of how their completions
    /// interleave.
    pub async fn process_link(&self, url: &str) {
        let key = normalize_link(url);
        {
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(last) = seen.get(&key) {
                if last.elapsed() < self.dedup_cooldown {
                    log::debug!("Suppressing duplicate deep link within cooldown: {}", key);
                    return;
                }
            }
            seen.insert(key, Instant::now());
        }

        if is_bare_scheme(url) {
            // App open with no payload. Counts as consumed for the pending
            // slot so a stale stored link cannot fire on a launch the user
            // did not trigger.
            log::info!("Bare-scheme activation, opening app without payload");
            if let Err(e) = self.pending.clear().await {
                log::warn!("Failed to clear pending slot on bare open: {}", e);
            }
            self.land_home();
            return;
        }

        self.dispatch(url).await;
    }

    /// Parse and forward one payload-carrying link. Exactly one navigation
    /// happens on every path out of this function.
    async fn dispatch(&self, url: &str) {
        let parsed = match parse_deep_link(url) {
            Some(link) => self.parser.parse_auth_init(&link).await,
            None => {
                Err(crate::services::protocol::ParseError::Malformed(
                    "no scheme".to_string(),
                ))
            }
        };

        match parsed {
            Ok(request) => {
                log::info!("Dispatching auth-init request (intent: {})", request.intent);
                self.set_dispatch_state(DataState::Loading);

                if let Err(e) = self.messenger.send_auth_init(request).await {
                    // Business failures surface through the operation
                    // registry; the deep-link path still lands somewhere.
                    log::warn!("Messenger rejected auth-init request: {}", e);
                }

                let route = self.resolve_landing();
                self.set_dispatch_state(DataState::Loaded(route.clone()));
                self.navigation.land(route);
            }
            Err(e) => {
                log::warn!("Deep link not dispatchable ({}), saving for retry", e);
                if let Err(pe) = self.pending.save(url).await {
                    log::error!("Failed to persist pending deep link: {}", pe);
                }
                self.set_dispatch_state(DataState::Error(e.to_string()));
                self.land_home();
            }
        }
    }

    fn resolve_landing(&self) -> Route {
        resolve_route(
            self.session.onboarding_complete(),
            self.session.has_credentials(),
            RouteIntent::Main,
        )
    }

    fn land_home(&self) {
        self.navigation.land(self.resolve_landing());
    }

    /// Cold-start recovery: first drain the durable pending slot (deleted
    /// before processing so a crash mid-dispatch cannot loop on relaunch),
    /// then the OS initial-URL channel, guarded to fire at most once per
    /// process so it cannot double-dispatch with a live event delivered in
    /// the same launch window.
    pub async fn handle_cold_start(&self, initial_url: Option<String>) {
        match self.pending.take().await {
            Ok(Some(url)) => {
                log::info!("Recovered pending deep link from previous session");
                self.process_link(&url).await;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to read pending deep link slot: {}", e),
        }

        if let Some(url) = initial_url {
            if self.initial_url_consumed.swap(true, Ordering::SeqCst) {
                log::debug!("Initial URL channel already consumed, ignoring");
            } else {
                self.process_link(&url).await;
            }
        }
    }

    /// Attach the live URL-activation event stream. Each delivery re-enters
    /// [`Self::process_link`]. The returned handle aborts the drain task on
    /// drop; hold it for as long as events should be handled.
    #[must_use]
    pub fn subscribe(
        self: Arc<Self>,
        mut receiver: mpsc::UnboundedReceiver<String>,
    ) -> UrlEventSubscription {
        let handle = tokio::spawn(async move {
            while let Some(url) = receiver.recv().await {
                self.process_link(&url).await;
            }
            log::debug!("URL event channel closed");
        });
        UrlEventSubscription { handle }
    }
}
