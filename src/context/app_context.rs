//! Application Context
//!
//! The one stateful object of the core. The host constructs it at launch
//! with its collaborator implementations, calls [`AppContext::init`] once,
//! and passes references down to whatever needs deep links, session state or
//! the operation registry. Disposal is explicit through
//! [`AppContext::shutdown`]; nothing here relies on global state or
//! construction order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::services::navigation::{
    resolve_route, NavigationCoordinator, Route, RouteIntent, Router,
};
use crate::services::protocol::{Messenger, ProtocolParser};
use crate::services::storage::{KeyValueStore, PendingLinkStore};
use crate::stores::deep_link::{DeepLinkManager, UrlEventSubscription};
use crate::stores::operations::{
    NotFoundError, Operation, OperationPayload, OperationRegistry, OperationStatus, OperationStep,
    StepPatch,
};
use crate::stores::session::SessionStore;
use crate::utils::data_state::DataState;

/// Tunable durations of the core. Both are UX contracts rather than
/// correctness requirements, which is exactly why they are named and
/// overridable instead of buried as literals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoreConfig {
    /// Window during which a re-delivered URL is suppressed
    pub dedup_cooldown: Duration,
    /// How long a terminal operation stays on screen before the result
    /// navigation fires
    pub result_dwell: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            dedup_cooldown: Duration::from_millis(3000),
            result_dwell: Duration::from_millis(1500),
        }
    }
}

/// Owns every store of the core and wires them to the collaborators
pub struct AppContext {
    config: CoreConfig,
    registry: Arc<OperationRegistry>,
    deep_links: Arc<DeepLinkManager>,
    session: Arc<SessionStore>,
    navigation: NavigationCoordinator,
    subscription: Mutex<Option<UrlEventSubscription>>,
}

impl AppContext {
    pub fn new(
        config: CoreConfig,
        storage: Arc<dyn KeyValueStore>,
        parser: Arc<dyn ProtocolParser>,
        messenger: Arc<dyn Messenger>,
        router: Arc<dyn Router>,
    ) -> Self {
        let navigation = NavigationCoordinator::new(router);
        let session = Arc::new(SessionStore::new(storage.clone()));
        let deep_links = Arc::new(DeepLinkManager::new(
            config.dedup_cooldown,
            PendingLinkStore::new(storage),
            parser,
            messenger,
            navigation.clone(),
            session.clone(),
        ));
        Self {
            config,
            registry: Arc::new(OperationRegistry::new()),
            deep_links,
            session,
            navigation,
            subscription: Mutex::new(None),
        }
    }

    /// One-time startup: restore session flags, run cold-start deep-link
    /// recovery, then attach the live URL-activation stream.
    pub async fn init(
        &self,
        initial_url: Option<String>,
        url_events: mpsc::UnboundedReceiver<String>,
    ) {
        log::info!("Initializing ticketflow core");
        self.session.load().await;
        self.deep_links.handle_cold_start(initial_url).await;

        let subscription = self.deep_links.clone().subscribe(url_events);
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    /// Explicit disposal: releases the URL subscription (aborting its drain
    /// task) and drops the current operation reference.
    pub fn shutdown(&self) {
        log::info!("Shutting down ticketflow core");
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.registry.clear();
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    // ============================================================================
    // Deep links
    // ============================================================================

    /// Feed one activation URL into the pipeline (hosts that receive URLs
    /// outside the subscribed event stream)
    pub async fn process_link(&self, url: &str) {
        self.deep_links.process_link(url).await;
    }

    /// Dispatch surface state for the skeleton/loading UI
    pub fn dispatch_state(&self) -> DataState<Route> {
        self.deep_links.dispatch_state()
    }

    // ============================================================================
    // Operations
    // ============================================================================

    /// Start a new operation and push its progress screen. Returns the
    /// fresh id; any previous operation stops being current.
    pub fn start_operation(&self, payload: OperationPayload) -> String {
        let params = HashMap::from([("title".to_string(), payload.summary())]);
        let id = self.registry.start(payload);
        self.navigation
            .push(Route::OperationPending { id: id.clone() }, params);
        id
    }

    pub fn append_operation_step(&self, id: &str, step: OperationStep) {
        self.registry.append_step(id, step);
    }

    pub fn update_operation_step(&self, id: &str, step_id: &str, patch: StepPatch) {
        self.registry.update_step(id, step_id, patch);
    }

    /// Progress callback entry point for the messaging collaborator. A
    /// terminal status additionally schedules the dwell-gated result
    /// navigation; the registry mutation itself lands synchronously.
    pub fn set_operation_status(
        &self,
        id: &str,
        status: OperationStatus,
        error: Option<String>,
        result: Option<serde_json::Value>,
    ) {
        let applied = self.registry.set_status(id, status, error, result);
        if applied && status.is_terminal() {
            self.schedule_result_navigation(id);
        }
    }

    /// Cancel a pending operation. Cancellation is cooperative: recorded
    /// state flips now, any in-flight remote call finishes on its own and
    /// its late callbacks no-op against the terminal state.
    pub fn cancel_operation(&self, id: &str) {
        if self.registry.cancel(id) {
            self.schedule_result_navigation(id);
        }
    }

    /// Drop the current operation reference (UI navigated away)
    pub fn clear_operation(&self) {
        self.registry.clear();
    }

    pub fn current_operation(&self) -> Option<Operation> {
        self.registry.current()
    }

    /// Operation lookup for the result screen; stale ids come back as an
    /// explicit not-found value for the UI to render
    pub fn operation(&self, id: &str) -> Result<Operation, NotFoundError> {
        self.registry.get(id)
    }

    /// Fire-and-forget dwell task: wait out the configured dwell, then land
    /// on the result view with history-clearing replace semantics.
    fn schedule_result_navigation(&self, id: &str) {
        let navigation = self.navigation.clone();
        let session = self.session.clone();
        let dwell = self.config.result_dwell;
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(dwell).await;
            let route = resolve_route(
                session.onboarding_complete(),
                session.has_credentials(),
                RouteIntent::OperationResult(id),
            );
            navigation.land(route);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStore;
    use crate::test_support::{RecordingMessenger, RecordingRouter, ScriptedParser};

    const DWELL: Duration = Duration::from_millis(1500);

    struct Fixture {
        context: AppContext,
        parser: Arc<ScriptedParser>,
        router: Arc<RecordingRouter>,
        storage: Arc<MemoryStore>,
    }

    async fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStore::new());
        storage.set("ticketflow_onboarding_complete", "true").await.unwrap();
        storage.set("ticketflow_npub", "npub1abc").await.unwrap();

        let parser = Arc::new(ScriptedParser::accepting());
        let router = Arc::new(RecordingRouter::new());
        let context = AppContext::new(
            CoreConfig::default(),
            storage.clone(),
            parser.clone(),
            Arc::new(RecordingMessenger::new()),
            router.clone(),
        );
        context.session().load().await;
        Fixture {
            context,
            parser,
            router,
            storage,
        }
    }

    fn charge() -> OperationPayload {
        OperationPayload::Charge {
            amount: 500,
            currency: "EUR".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_recovers_pending_link_and_attaches_stream() {
        let fx = fixture().await;
        fx.storage.set("ticketflow_pending_link", "ticketflow://pay?amount=5").await.unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        fx.context.init(None, rx).await;
        assert_eq!(fx.parser.parse_calls(), 1);
        assert_eq!(fx.storage.get("ticketflow_pending_link").await.unwrap(), None);

        // Live events flow through the attached subscription
        tx.send("ticketflow://verify/T1".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fx.parser.parse_calls(), 2);

        // After shutdown the stream is released
        fx.context.shutdown();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let _ = tx.send("ticketflow://verify/T2".to_string());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fx.parser.parse_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_operation_pushes_progress_screen() {
        let fx = fixture().await;

        let id = fx.context.start_operation(charge());

        assert_eq!(fx.router.calls(), vec![format!("push:/operations/{}", id)]);
        let op = fx.context.current_operation().unwrap();
        assert_eq!(op.id, id);
        assert_eq!(op.status, OperationStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_navigates_after_dwell() {
        let fx = fixture().await;
        let id = fx.context.start_operation(charge());

        fx.context.set_operation_status(
            &id,
            OperationStatus::Success,
            None,
            Some(serde_json::json!({"txId": "abc"})),
        );

        // Mutation lands immediately, navigation waits out the dwell
        assert_eq!(fx.context.operation(&id).unwrap().status, OperationStatus::Success);
        assert_eq!(fx.router.replace_count(), 0);

        tokio::time::sleep(DWELL + Duration::from_millis(10)).await;
        assert_eq!(fx.router.replace_count(), 1);
        assert!(fx
            .router
            .calls()
            .contains(&format!("replace:/operations/{}/result", id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_navigates_to_result_after_dwell() {
        let fx = fixture().await;
        let id = fx.context.start_operation(charge());

        fx.context.cancel_operation(&id);

        let op = fx.context.operation(&id).unwrap();
        assert_eq!(op.status, OperationStatus::Error);
        assert_eq!(op.error.as_deref(), Some("Operation cancelled by user"));

        tokio::time::sleep(DWELL + Duration::from_millis(10)).await;
        assert_eq!(fx.router.replace_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_transitions_do_not_navigate() {
        let fx = fixture().await;
        let id = fx.context.start_operation(charge());
        fx.context.set_operation_status(&id, OperationStatus::Success, None, None);

        // Late error callback and a stale-id callback are both no-ops
        fx.context.set_operation_status(&id, OperationStatus::Error, None, None);
        fx.context.set_operation_status("stale-id", OperationStatus::Success, None, None);
        fx.context.cancel_operation(&id);

        tokio::time::sleep(DWELL * 3).await;
        // Only the first terminal transition navigated
        assert_eq!(fx.router.replace_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_lookup_is_explicit_not_found() {
        let fx = fixture().await;
        let id = fx.context.start_operation(charge());
        fx.context.clear_operation();

        let err = fx.context.operation(&id).unwrap_err();
        assert_eq!(err.id, id);
        assert!(fx.context.current_operation().is_none());
    }
}
