//! Read states and fetch results handed out by the query cache.

use chrono::{DateTime, Utc};

use crate::api::ApiError;

/// The state of one cached read
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Nothing fetched yet, or the read is disabled
  Idle,
  /// A fetch is in flight; `previous` is whatever was cached before it
  Loading { previous: Option<T> },
  /// Cached and fresh
  Success { data: T, fetched_at: DateTime<Utc> },
  /// Cached but past the stale time (or invalidated); the next read refetches
  Stale { data: T, fetched_at: DateTime<Utc> },
  /// The last fetch failed; the last good value is kept
  Error { error: ApiError, previous: Option<T> },
}

impl<T> QueryState<T> {
  pub fn is_idle(&self) -> bool {
    matches!(self, QueryState::Idle)
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading { .. })
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success { .. })
  }

  pub fn is_stale(&self) -> bool {
    matches!(self, QueryState::Stale { .. })
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error { .. })
  }

  /// Best value available, including one kept across a failure or refetch
  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Idle => None,
      QueryState::Loading { previous } | QueryState::Error { previous, .. } => previous.as_ref(),
      QueryState::Success { data, .. } | QueryState::Stale { data, .. } => Some(data),
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error { error, .. } => Some(error),
      _ => None,
    }
  }

  /// Collapse into a plain result: errors become `Err`, everything else the best value.
  pub fn into_result(self) -> Result<Option<T>, ApiError> {
    match self {
      QueryState::Idle => Ok(None),
      QueryState::Loading { previous } => Ok(previous),
      QueryState::Success { data, .. } | QueryState::Stale { data, .. } => Ok(Some(data)),
      QueryState::Error { error, .. } => Err(error),
    }
  }
}

/// What a list read should show. Exactly one applies at any time.
#[derive(Debug, PartialEq)]
pub enum ListState<'a, T> {
  Loading,
  Error(&'a ApiError),
  Empty,
  Items(&'a [T]),
}

impl<T> QueryState<Vec<T>> {
  pub fn list_state(&self) -> ListState<'_, T> {
    if let QueryState::Error { error, .. } = self {
      return ListState::Error(error);
    }

    match self.data() {
      None => ListState::Loading,
      Some(items) if items.is_empty() => ListState::Empty,
      Some(items) => ListState::Items(items),
    }
  }
}

/// Where the value returned by a fetch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Served from cache without a request
  Cache,
  /// Joined a request another caller had already started
  Shared,
}

/// Result from a cache fetch, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
  /// When the data was fetched
  pub fetched_at: DateTime<Utc>,
}
