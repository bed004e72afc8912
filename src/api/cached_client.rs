//! Users client with transparent caching, built on UsersApi and QueryCache.

use std::sync::Arc;
use tracing::info;

use crate::auth::{CredentialProvider, SessionHandler};
use crate::cache::{user_keys, CacheOptions, CacheResult, QueryCache, QueryKey, QueryState};
use crate::config::Config;

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{CreateUserInput, UpdateUserInput, User, UserProfile};
use super::users::UsersApi;

/// Users client with transparent caching support.
///
/// Reads go through the cache and report a [`QueryState`]; writes always
/// hit the network and then fix up the entries they affect.
#[derive(Debug, Clone)]
pub struct CachedUsersClient {
  inner: UsersApi,
  cache: QueryCache,
}

impl CachedUsersClient {
  /// Create a new cached users client.
  pub fn new(
    config: &Config,
    credentials: Arc<dyn CredentialProvider>,
    session: Arc<dyn SessionHandler>,
  ) -> Result<Self, ApiError> {
    let client = ApiClient::new(&config.api, credentials, session)?;
    Ok(Self::with_cache(
      UsersApi::new(client),
      QueryCache::new(config.cache.options()),
    ))
  }

  pub fn with_cache(inner: UsersApi, cache: QueryCache) -> Self {
    Self { inner, cache }
  }

  /// Build with default cache timings
  pub fn from_api(inner: UsersApi) -> Self {
    Self::with_cache(inner, QueryCache::new(CacheOptions::default()))
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn api(&self) -> &UsersApi {
    &self.inner
  }

  /// All users.
  pub async fn users(&self) -> QueryState<Vec<User>> {
    let key = user_keys::list(None);
    let inner = self.inner.clone();
    let result = self.cache.fetch(&key, move || async move { inner.list().await }).await;
    self.settled(&key, result)
  }

  /// One user. Non-positive ids stay idle and never reach the network.
  pub async fn user(&self, id: i64) -> QueryState<User> {
    if id <= 0 {
      return QueryState::Idle;
    }

    let key = user_keys::detail(id);
    let inner = self.inner.clone();
    let result = self.cache.fetch(&key, move || async move { inner.get(id).await }).await;
    self.settled(&key, result)
  }

  /// One user's profile. Non-positive ids stay idle.
  pub async fn user_profile(&self, id: i64) -> QueryState<UserProfile> {
    if id <= 0 {
      return QueryState::Idle;
    }

    let key = user_keys::profile(id);
    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch(&key, move || async move { inner.get_profile(id).await })
      .await;
    self.settled(&key, result)
  }

  /// Create a user, then make list reads refetch.
  pub async fn create_user(&self, input: &CreateUserInput) -> Result<User, ApiError> {
    let user = self.inner.create(input).await?;
    info!("Created user {}", user.id);
    self.cache.invalidate(&user_keys::lists());
    Ok(user)
  }

  /// Update a user, store the result as its detail entry and make list reads refetch.
  pub async fn update_user(&self, id: i64, input: &UpdateUserInput) -> Result<User, ApiError> {
    let user = self.inner.update(id, input).await?;
    info!("Updated user {}", id);
    self.cache.set_data(&user_keys::detail(id), user.clone());
    self.cache.invalidate(&user_keys::lists());
    Ok(user)
  }

  /// Delete a user, drop its detail entry and make list reads refetch.
  pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
    self.inner.delete(id).await?;
    info!("Deleted user {}", id);
    self.cache.remove(&user_keys::detail(id));
    self.cache.invalidate(&user_keys::lists());
    Ok(())
  }

  /// Tear down the cache.
  pub fn shutdown(&self) {
    self.cache.shutdown();
  }

  /// Turn a finished fetch into the state the caller should see.
  fn settled<T>(
    &self,
    key: &QueryKey,
    result: Result<CacheResult<T>, ApiError>,
  ) -> QueryState<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    match result {
      Ok(fetched) => QueryState::Success {
        data: fetched.data,
        fetched_at: fetched.fetched_at,
      },
      Err(error) => {
        let previous = self.cache.state::<T>(key).data().cloned();
        QueryState::Error { error, previous }
      }
    }
  }
}
