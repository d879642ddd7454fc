//! ticketflow-core
//!
//! Application core for the Ticketflow client: deep-link ingestion and
//! dispatch, durable pending-link recovery, and the lifecycle state machine
//! for in-flight user operations (charge, verify ticket, sell ticket).
//!
//! Signing, Nostr messaging and wallet-connect live in external collaborators
//! reached through the traits in [`services`]; this crate owns only the
//! coordination logic between OS activations, those collaborators, and the
//! host UI's router.

// Modules
pub mod context;
pub mod services;
pub mod stores;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::app_context::{AppContext, CoreConfig};
pub use services::navigation::{resolve_route, NavigationCoordinator, Route, RouteIntent, Router};
pub use services::protocol::{
    AuthInitRequest, Messenger, MessengerError, ParseError, ProtocolParser,
};
pub use services::storage::{
    KeyValueStore, MemoryStore, PendingLinkStore, StorageError,
};
pub use stores::deep_link::{DeepLinkManager, UrlEventSubscription};
pub use stores::operations::{
    NotFoundError, Operation, OperationErrorType, OperationPayload, OperationRegistry,
    OperationStatus, OperationStep, StepPatch, StepStatus, CANCELLED_BY_USER,
};
pub use stores::session::SessionStore;
pub use utils::data_state::DataState;
pub use utils::deep_link::DeepLink;
