use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a user. The API hands out numbers, but string ids are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
  Number(i64),
  Text(String),
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      UserId::Number(n) => write!(f, "{}", n),
      UserId::Text(s) => f.write_str(s),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Member,
  Guest,
}

impl Role {
  pub const ALL: [&'static str; 3] = ["admin", "member", "guest"];

  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Admin => "admin",
      Role::Member => "member",
      Role::Guest => "guest",
    }
  }
}

impl std::str::FromStr for Role {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "admin" => Ok(Role::Admin),
      "member" => Ok(Role::Member),
      "guest" => Ok(Role::Guest),
      other => Err(format!(
        "unknown role '{}', expected one of {}",
        other,
        Role::ALL.join(", ")
      )),
    }
  }
}

/// A user record as served by `GET /users` and `GET /users/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: UserId,
  pub name: String,
  pub email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
  pub role: Role,
  pub created_at: String,
  pub updated_at: String,
}

/// A user plus the optional profile fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  #[serde(flatten)]
  pub user: User,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bio: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub website: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
}

/// Payload for `POST /users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUserInput {
  pub name: String,
  pub email: String,
  pub password: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<Role>,
}

/// Partial payload for `PATCH /users/{id}`; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUserInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bio: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub website: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
}

impl UpdateUserInput {
  pub fn is_empty(&self) -> bool {
    self == &UpdateUserInput::default()
  }
}

/// Error body returned by the API alongside non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
  pub message: String,
}
