//! Structured query keys.

use std::fmt;

/// One element of a query key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
  Text(String),
  Int(i64),
}

impl From<&str> for KeyPart {
  fn from(s: &str) -> Self {
    KeyPart::Text(s.to_string())
  }
}

impl From<i64> for KeyPart {
  fn from(n: i64) -> Self {
    KeyPart::Int(n)
  }
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyPart::Text(s) => f.write_str(s),
      KeyPart::Int(n) => write!(f, "{}", n),
    }
  }
}

/// Ordered tuple addressing one cached read, e.g. `(users, detail, 1)`.
///
/// Shorter keys act as prefixes: invalidating `(users, list)` touches every
/// list key whatever its filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
  pub fn new(parts: impl IntoIterator<Item = KeyPart>) -> Self {
    Self(parts.into_iter().collect())
  }

  /// Extend this key with one more part
  pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
    self.0.push(part.into());
    self
  }

  pub fn parts(&self) -> &[KeyPart] {
    &self.0
  }

  /// Whether `self` is a prefix of (or equal to) `other`
  pub fn matches(&self, other: &QueryKey) -> bool {
    other.0.starts_with(&self.0)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
    write!(f, "[{}]", parts.join(", "))
  }
}

/// Key builders for the users resource.
pub mod user_keys {
  use super::{KeyPart, QueryKey};

  pub fn all() -> QueryKey {
    QueryKey::new([KeyPart::from("users")])
  }

  pub fn lists() -> QueryKey {
    all().with("list")
  }

  /// A list read, optionally narrowed by a filter
  pub fn list(filter: Option<&str>) -> QueryKey {
    match filter {
      Some(f) => lists().with(f),
      None => lists(),
    }
  }

  pub fn details() -> QueryKey {
    all().with("detail")
  }

  pub fn detail(id: i64) -> QueryKey {
    details().with(id)
  }

  pub fn profile(id: i64) -> QueryKey {
    all().with("profile").with(id)
  }
}
