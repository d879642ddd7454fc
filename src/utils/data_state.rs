/// State machine for async data surfaces
///
/// Replaces separate is_loading/has_error flags with a single enum so a
/// surface (the deep-link dispatch skeleton, an operation result view) can
/// only ever be in one state at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum DataState<T> {
    /// Initial state, no action taken yet
    Pending,

    /// Request is in flight
    Loading,

    /// Finished with data
    Loaded(T),

    /// Finished with an error message
    Error(String),
}

impl<T> DataState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, DataState::Pending)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DataState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, DataState::Loaded(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DataState::Error(_))
    }

    /// Returns the data if loaded, None otherwise
    pub fn data(&self) -> Option<&T> {
        match self {
            DataState::Loaded(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the error message if in error state, None otherwise
    pub fn error(&self) -> Option<&str> {
        match self {
            DataState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

impl<T> Default for DataState<T> {
    fn default() -> Self {
        DataState::Pending
    }
}

/// Helper to collapse a Result into a terminal DataState
impl<T, E: std::fmt::Display> From<Result<T, E>> for DataState<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => DataState::Loaded(data),
            Err(err) => DataState::Error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        let state: DataState<i32> = DataState::default();
        assert!(state.is_pending());

        let state: DataState<i32> = DataState::Loading;
        assert!(state.is_loading());

        let state = DataState::Loaded("/");
        assert!(state.is_loaded());
        assert_eq!(state.data(), Some(&"/"));

        let state: DataState<i32> = DataState::Error("parse failed".to_string());
        assert!(state.is_error());
        assert_eq!(state.error(), Some("parse failed"));
    }

    #[test]
    fn test_from_result() {
        let ok: Result<u32, String> = Ok(7);
        assert_eq!(DataState::from(ok).data(), Some(&7));

        let err: Result<u32, String> = Err("boom".to_string());
        assert!(DataState::from(err).is_error());
    }
}
