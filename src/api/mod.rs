//! Users API: typed payloads, their shapes, the HTTP client and one function per endpoint.

pub mod cached_client;
pub mod client;
pub mod error;
pub mod schema;
pub mod types;
pub mod users;

pub use cached_client::CachedUsersClient;
pub use client::ApiClient;
pub use error::{ApiError, FieldIssue, ValidationError};
pub use types::{CreateUserInput, Role, UpdateUserInput, User, UserId, UserProfile};
pub use users::UsersApi;

impl CreateUserInput {
  /// Check the input against its shape before sending it.
  pub fn validate(&self) -> Result<(), ValidationError> {
    validate_input(self)
  }
}

impl UpdateUserInput {
  /// Check the fields that are present against their constraints.
  pub fn validate(&self) -> Result<(), ValidationError> {
    validate_input(self)
  }
}

fn validate_input<T: schema::Validated + serde::Serialize>(input: &T) -> Result<(), ValidationError> {
  let value = serde_json::to_value(input)
    .map_err(|e| ValidationError::single(T::SHAPE.name, "(root)", e.to_string()))?;
  schema::validate(T::SHAPE, &value)
}
