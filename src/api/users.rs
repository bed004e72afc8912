use serde_json::Value;

use super::client::ApiClient;
use super::error::{ApiError, ValidationError};
use super::schema::{self, parse};
use super::types::{CreateUserInput, UpdateUserInput, User, UserProfile};

/// One method per users endpoint; each response is validated before it is returned.
#[derive(Debug, Clone)]
pub struct UsersApi {
  client: ApiClient,
}

impl UsersApi {
  pub fn new(client: ApiClient) -> Self {
    Self { client }
  }

  pub fn client(&self) -> &ApiClient {
    &self.client
  }

  /// Get all users, in the order the server returned them
  pub async fn list(&self) -> Result<Vec<User>, ApiError> {
    let body = self.client.get("/users").await?;

    let Value::Array(items) = body else {
      return Err(
        ValidationError::single(schema::USER.name, "(root)", "expected array of users").into(),
      );
    };

    items
      .into_iter()
      .map(|item| parse::<User>(item).map_err(ApiError::from))
      .collect()
  }

  /// Get a single user
  pub async fn get(&self, id: i64) -> Result<User, ApiError> {
    let body = self.client.get(&format!("/users/{}", id)).await?;
    Ok(parse(body)?)
  }

  /// Get a user's profile
  pub async fn get_profile(&self, id: i64) -> Result<UserProfile, ApiError> {
    let body = self.client.get(&format!("/users/{}/profile", id)).await?;
    Ok(parse(body)?)
  }

  /// Create a user. The input is sent as-is; the server is the authority on it.
  pub async fn create(&self, input: &CreateUserInput) -> Result<User, ApiError> {
    let body = self.client.post("/users", input).await?;
    Ok(parse(body)?)
  }

  /// Apply a partial update to a user
  pub async fn update(&self, id: i64, input: &UpdateUserInput) -> Result<User, ApiError> {
    let body = self.client.patch(&format!("/users/{}", id), input).await?;
    Ok(parse(body)?)
  }

  pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
    self.client.delete(&format!("/users/{}", id)).await
  }
}
