//! Operation Registry - lifecycle tracking for in-flight user actions
//!
//! A charge, ticket verification or ticket sale runs asynchronously through
//! the messaging collaborator while the UI shows its progress steps. The
//! registry tracks exactly one "current" operation: starting a new one
//! replaces the old reference (no queue), and a finished operation never
//! transitions back to pending - retry means a brand-new operation with a
//! fresh id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::utils::time;

/// Error text recorded when the user cancels a pending operation
pub const CANCELLED_BY_USER: &str = "Operation cancelled by user";

/// Lifecycle status of an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Success,
    Error,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// Status of a single progress step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Completed,
    Success,
    Error,
}

/// Classified business failure reported by the messaging collaborator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationErrorType {
    InsufficientFunds,
    NetworkError,
    PaymentDeclined,
    UnknownError,
}

impl fmt::Display for OperationErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds => write!(f, "Insufficient funds"),
            Self::NetworkError => write!(f, "Network error"),
            Self::PaymentDeclined => write!(f, "Payment declined"),
            Self::UnknownError => write!(f, "Unknown error"),
        }
    }
}

/// What the operation is doing, one closed variant per kind. The tag keys
/// the union so a charge can never carry ticket fields and vice versa.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationPayload {
    Charge {
        amount: u64,
        currency: String,
    },
    VerifyTicket {
        ticket_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        ticket_title: Option<String>,
    },
    SellTicket {
        ticket_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        ticket_title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        price: Option<u64>,
    },
}

impl OperationPayload {
    /// Stable kind tag, matching the serialized form
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Charge { .. } => "charge",
            Self::VerifyTicket { .. } => "verify_ticket",
            Self::SellTicket { .. } => "sell_ticket",
        }
    }

    /// Short human-readable label for progress screens
    pub fn summary(&self) -> String {
        match self {
            Self::Charge { amount, currency } => format!("Charge {} {}", amount, currency),
            Self::VerifyTicket { ticket_id, ticket_title } => match ticket_title {
                Some(title) => format!("Verify {}", title),
                None => format!("Verify ticket {}", ticket_id),
            },
            Self::SellTicket { ticket_id, ticket_title, .. } => match ticket_title {
                Some(title) => format!("Sell {}", title),
                None => format!("Sell ticket {}", ticket_id),
            },
        }
    }
}

/// One entry in an operation's ordered progress list. Steps are appended
/// and updated in place, never reordered or removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationStep {
    pub id: String,
    pub status: StepStatus,
    pub title: String,
    pub subtitle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<OperationErrorType>,
}

/// Partial update merged into an existing step by id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepPatch {
    pub status: Option<StepStatus>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub error_type: Option<OperationErrorType>,
}

/// An in-flight (or finished) user action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique per process lifetime, immutable once assigned
    pub id: String,
    pub payload: OperationPayload,
    pub status: OperationStatus,
    pub steps: Vec<OperationStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Lookup of an operation id that is not the current operation. Rendered as
/// an explicit not-found state, never propagated as a panic.
#[derive(Debug, Clone, PartialEq)]
pub struct NotFoundError {
    pub id: String,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operation not found: {}", self.id)
    }
}

/// Holds the single current operation and applies lifecycle transitions.
///
/// Every mutating method takes the id it expects to act on and no-ops on a
/// mismatch: a callback racing a newer `start` silently loses instead of
/// corrupting the new operation.
#[derive(Default)]
pub struct OperationRegistry {
    current: Mutex<Option<Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh operation and make it current, discarding the previous
    /// current reference (without mutating the old value - clones held
    /// elsewhere stay valid, they are just no longer current).
    pub fn start(&self, payload: OperationPayload) -> String {
        let id = Uuid::new_v4().to_string();
        let operation = Operation {
            id: id.clone(),
            payload,
            status: OperationStatus::Pending,
            steps: Vec::new(),
            error: None,
            result: None,
            started_at: time::now(),
            ended_at: None,
        };
        log::info!("Starting operation {} ({})", id, operation.payload.kind());

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.as_ref() {
            log::debug!("Replacing current operation {}", previous.id);
        }
        *current = Some(operation);
        id
    }

    /// Append a progress step. No-op if `id` is not the current operation.
    pub fn append_step(&self, id: &str, step: OperationStep) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_mut() {
            Some(op) if op.id == id => op.steps.push(step),
            _ => log::debug!("append_step ignored for non-current operation {}", id),
        }
    }

    /// Merge a patch into the step with `step_id`. No-op on id mismatch or
    /// unknown step.
    pub fn update_step(&self, id: &str, step_id: &str, patch: StepPatch) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(op) = current.as_mut().filter(|op| op.id == id) else {
            log::debug!("update_step ignored for non-current operation {}", id);
            return;
        };
        let Some(step) = op.steps.iter_mut().find(|s| s.id == step_id) else {
            log::debug!("update_step ignored for unknown step {} on {}", step_id, id);
            return;
        };
        if let Some(status) = patch.status {
            step.status = status;
        }
        if let Some(title) = patch.title {
            step.title = title;
        }
        if let Some(subtitle) = patch.subtitle {
            step.subtitle = subtitle;
        }
        if let Some(error_type) = patch.error_type {
            step.error_type = Some(error_type);
        }
    }

    /// Apply a status transition. Terminal statuses stamp the end time; a
    /// terminal operation never changes status again. Returns whether the
    /// transition was applied, so callers know to schedule the result
    /// navigation.
    pub fn set_status(
        &self,
        id: &str,
        status: OperationStatus,
        error: Option<String>,
        result: Option<serde_json::Value>,
    ) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(op) = current.as_mut().filter(|op| op.id == id) else {
            log::debug!("set_status ignored for non-current operation {}", id);
            return false;
        };
        if op.status.is_terminal() {
            log::warn!(
                "Ignoring status change on finished operation {} ({:?} -> {:?})",
                id,
                op.status,
                status
            );
            return false;
        }
        op.status = status;
        if let Some(error) = error {
            op.error = Some(error);
        }
        if let Some(result) = result {
            op.result = Some(result);
        }
        if status.is_terminal() {
            op.ended_at = Some(time::now());
            log::info!(
                "Operation {} finished with {:?} after {}",
                id,
                status,
                time::format_elapsed(op.started_at, op.ended_at.unwrap_or(op.started_at))
            );
        }
        true
    }

    /// Cancel a pending operation: forces an error terminal state with the
    /// standard cancellation message. No-op if the operation already
    /// finished - a terminal state cannot be cancelled. This only flips
    /// recorded state; an in-flight remote call is not preempted.
    pub fn cancel(&self, id: &str) -> bool {
        {
            let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            match current.as_ref().filter(|op| op.id == id) {
                Some(op) if op.status == OperationStatus::Pending => {}
                Some(_) => {
                    log::debug!("cancel ignored: operation {} already finished", id);
                    return false;
                }
                None => {
                    log::debug!("cancel ignored for non-current operation {}", id);
                    return false;
                }
            }
        }
        self.set_status(
            id,
            OperationStatus::Error,
            Some(CANCELLED_BY_USER.to_string()),
            None,
        )
    }

    /// Drop the current reference entirely (the UI navigated away)
    pub fn clear(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(op) = current.take() {
            log::debug!("Cleared current operation {}", op.id);
        }
    }

    /// Snapshot of the current operation, if any
    pub fn current(&self) -> Option<Operation> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Look up an operation by id. Anything other than the current
    /// operation is an explicit not-found value.
    pub fn get(&self, id: &str) -> Result<Operation, NotFoundError> {
        self.current()
            .filter(|op| op.id == id)
            .ok_or_else(|| NotFoundError { id: id.to_string() })
    }
}
