//! Navigation coordination
//!
//! The host owns the actual router; this module owns the decision of where
//! to land and the rule that every deep-link and operation-terminal
//! navigation clears transient history. A user must never be able to
//! back-navigate into a stale "processing" screen.

use std::collections::HashMap;
use std::sync::Arc;

/// App routes this core can land on
#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    /// First-run onboarding flow
    Onboarding,
    /// Settings/setup surface (onboarded but no credential material)
    Settings,
    /// Main authenticated tab view
    MainTabs,
    /// In-flight operation progress screen
    OperationPending { id: String },
    /// Terminal operation result screen
    OperationResult { id: String },
    /// Explicit not-found state for stale operation ids
    NotFound,
}

impl Route {
    /// Render the route path for the host router
    pub fn path(&self) -> String {
        match self {
            Self::Onboarding => "/onboarding".to_string(),
            Self::Settings => "/settings".to_string(),
            Self::MainTabs => "/".to_string(),
            Self::OperationPending { id } => format!("/operations/{}", id),
            Self::OperationResult { id } => format!("/operations/{}/result", id),
            Self::NotFound => "/not-found".to_string(),
        }
    }
}

/// What the caller wanted to show, before session gating
#[derive(Clone, Debug, PartialEq)]
pub enum RouteIntent {
    /// Land on the main surface (deep-link arrivals, app opens)
    Main,
    /// Show a finished operation's result
    OperationResult(String),
}

/// Decide the one route to land on.
///
/// Session gates come first: an un-onboarded user always sees onboarding and
/// a user with no credential material always sees settings, whatever
/// triggered the navigation. Only a fully set-up session reaches the
/// intended surface.
pub fn resolve_route(onboarding_complete: bool, has_credentials: bool, intent: RouteIntent) -> Route {
    if !onboarding_complete {
        return Route::Onboarding;
    }
    if !has_credentials {
        return Route::Settings;
    }
    match intent {
        RouteIntent::Main => Route::MainTabs,
        RouteIntent::OperationResult(id) => Route::OperationResult { id },
    }
}

/// Host router collaborator. Calls are synchronous UI-thread commands.
pub trait Router: Send + Sync {
    /// Replace the current history entry
    fn replace(&self, path: &str);
    /// Push a new entry with params
    fn push(&self, path: &str, params: &HashMap<String, String>);
    /// Dismiss any presented modals/transient screens
    fn dismiss_all(&self);
}

/// Wraps the host router with the history-clearing landing policy
#[derive(Clone)]
pub struct NavigationCoordinator {
    router: Arc<dyn Router>,
}

impl NavigationCoordinator {
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self { router }
    }

    /// Land on a route with replace semantics, dismissing transient screens
    /// first. Used for every deep-link and operation-terminal navigation.
    pub fn land(&self, route: Route) {
        let path = route.path();
        log::info!("Navigating (replace) to {}", path);
        self.router.dismiss_all();
        self.router.replace(&path);
    }

    /// Push a detail screen (operation progress view). Push is allowed here
    /// because the progress screen is dismissed again by [`Self::land`].
    pub fn push(&self, route: Route, params: HashMap<String, String>) {
        let path = route.path();
        log::debug!("Navigating (push) to {}", path);
        self.router.push(&path, &params);
    }
}
