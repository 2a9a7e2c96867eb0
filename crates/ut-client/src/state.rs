use crate::error::Result;

/// Outcome of the last request a cache made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Succeeded,
    Failed(String),
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Succeeded)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Records the outcome and hands the result back unchanged.
    pub(crate) fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        *self = match &result {
            Ok(_) => LoadState::Succeeded,
            Err(err) => LoadState::Failed(err.to_string()),
        };
        result
    }
}
