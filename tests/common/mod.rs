//! Shared fixtures for the HTTP tests.

#![allow(dead_code)]

use mockito::ServerGuard;
use parking_lot::Mutex;
use std::sync::Arc;

use roster::api::{ApiClient, CachedUsersClient, UsersApi};
use roster::auth::{MemoryCredentials, SessionHandler};
use roster::config::ApiConfig;

/// Session handler that remembers where it was sent.
#[derive(Default)]
pub struct RecordingSession {
  pub redirects: Mutex<Vec<String>>,
}

impl SessionHandler for RecordingSession {
  fn login_required(&self, location: &str) {
    self.redirects.lock().push(location.to_string());
  }
}

pub struct Fixture {
  pub credentials: Arc<MemoryCredentials>,
  pub session: Arc<RecordingSession>,
  pub client: ApiClient,
}

pub fn fixture(server: &ServerGuard, token: Option<&str>) -> Fixture {
  fixture_for(&server.url(), token)
}

pub fn fixture_for(base_url: &str, token: Option<&str>) -> Fixture {
  let credentials = Arc::new(MemoryCredentials::new(token.map(String::from)));
  let session = Arc::new(RecordingSession::default());
  let config = ApiConfig {
    base_url: base_url.to_string(),
    ..ApiConfig::default()
  };
  let client = ApiClient::new(&config, credentials.clone(), session.clone())
    .expect("Failed to create API client");

  Fixture {
    credentials,
    session,
    client,
  }
}

pub fn users_api(server: &ServerGuard) -> UsersApi {
  UsersApi::new(fixture(server, None).client)
}

pub fn cached_client(server: &ServerGuard) -> CachedUsersClient {
  CachedUsersClient::from_api(users_api(server))
}

pub fn user_json(id: i64, name: &str) -> String {
  format!(
    r#"{{
      "id": {id},
      "name": "{name}",
      "email": "{email}@example.com",
      "role": "member",
      "createdAt": "2024-01-01T00:00:00Z",
      "updatedAt": "2024-01-01T00:00:00Z"
    }}"#,
    email = name.to_lowercase().replace(' ', ".")
  )
}

pub fn users_json(users: &[(i64, &str)]) -> String {
  let items: Vec<String> = users.iter().map(|(id, name)| user_json(*id, name)).collect();
  format!("[{}]", items.join(","))
}
