// Utility functions
// Pure helpers with no collaborator dependencies

pub mod data_state;
pub mod deep_link;
pub mod time;

pub use data_state::DataState;
pub use deep_link::{is_bare_scheme, normalize_link, parse_deep_link, DeepLink};
