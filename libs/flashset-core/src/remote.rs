//! Load state of data owned by the storage collaborator.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Where a remote value is in its load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Absent,
    Loading,
    Present,
    Failed,
}

/// A value fetched asynchronously.
///
/// A refetch keeps the previous value visible while `is_fetching` is set, but
/// nothing may schedule or filter against it until the fetch settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remote<T> {
    pub value: Option<T>,
    pub is_fetching: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Default for Remote<T> {
    fn default() -> Self {
        Self {
            value: None,
            is_fetching: false,
            error: None,
        }
    }
}

impl<T> Remote<T> {
    pub fn present(value: T) -> Self {
        Self {
            value: Some(value),
            is_fetching: false,
            error: None,
        }
    }

    pub fn status(&self) -> RemoteStatus {
        if self.is_fetching {
            RemoteStatus::Loading
        } else if self.error.is_some() {
            RemoteStatus::Failed
        } else if self.value.is_some() {
            RemoteStatus::Present
        } else {
            RemoteStatus::Absent
        }
    }

    /// Mark a fetch as started, keeping any previous value.
    pub fn fetching(self) -> Self {
        Self {
            is_fetching: true,
            error: None,
            ..self
        }
    }

    pub fn received(self, value: T) -> Self {
        Self::present(value)
    }

    pub fn failed(self, message: impl Into<String>) -> Self {
        Self {
            is_fetching: false,
            error: Some(message.into()),
            ..self
        }
    }

    /// Map the settled value, leaving the load state alone.
    pub fn map_value(self, f: impl FnOnce(T) -> T) -> Self {
        Self {
            value: self.value.map(f),
            ..self
        }
    }

    /// The value, if it is settled and usable for scheduling.
    ///
    /// `what` names the entity in the error.
    pub fn require(&self, what: &str) -> Result<&T> {
        match self.status() {
            RemoteStatus::Present => self.value.as_ref().ok_or_else(|| CoreError::NotReady {
                what: what.to_string(),
            }),
            RemoteStatus::Failed => Err(CoreError::FetchFailed {
                what: what.to_string(),
                message: self.error.clone().unwrap_or_default(),
            }),
            RemoteStatus::Absent | RemoteStatus::Loading => Err(CoreError::NotReady {
                what: what.to_string(),
            }),
        }
    }
}
