//! Declarative shapes for API payloads and the routine that checks them.
//!
//! A [`Shape`] is plain data: field names paired with the constraint each
//! field must satisfy. [`validate`] walks a shape over an untyped JSON value
//! and collects every violation, so callers get the full picture in one
//! error instead of fixing fields one at a time.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::error::{FieldIssue, ValidationError};
use super::types::{CreateUserInput, Role, UpdateUserInput, User, UserProfile};

static EMAIL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("valid email regex"));

/// What a field's value must look like
#[derive(Debug, Clone, Copy)]
pub enum Kind {
  /// Number or string
  Id,
  Text,
  Email,
  Url,
  OneOf(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
  pub name: &'static str,
  pub kind: Kind,
  pub optional: bool,
  pub min_len: usize,
}

impl Field {
  const fn required(name: &'static str, kind: Kind) -> Self {
    Self {
      name,
      kind,
      optional: false,
      min_len: 0,
    }
  }

  const fn optional(name: &'static str, kind: Kind) -> Self {
    Self {
      name,
      kind,
      optional: true,
      min_len: 0,
    }
  }

  const fn min(mut self, min_len: usize) -> Self {
    self.min_len = min_len;
    self
  }
}

#[derive(Debug)]
pub struct Shape {
  pub name: &'static str,
  pub fields: &'static [Field],
}

const USER_FIELDS: [Field; 7] = [
  Field::required("id", Kind::Id),
  Field::required("name", Kind::Text).min(1),
  Field::required("email", Kind::Email),
  Field::optional("avatar", Kind::Url),
  Field::required("role", Kind::OneOf(&Role::ALL)),
  Field::required("createdAt", Kind::Text),
  Field::required("updatedAt", Kind::Text),
];

const PROFILE_FIELDS: [Field; 10] = [
  USER_FIELDS[0],
  USER_FIELDS[1],
  USER_FIELDS[2],
  USER_FIELDS[3],
  USER_FIELDS[4],
  USER_FIELDS[5],
  USER_FIELDS[6],
  Field::optional("bio", Kind::Text),
  Field::optional("website", Kind::Url),
  Field::optional("location", Kind::Text),
];

pub const USER: Shape = Shape {
  name: "User",
  fields: &USER_FIELDS,
};

pub const USER_PROFILE: Shape = Shape {
  name: "UserProfile",
  fields: &PROFILE_FIELDS,
};

pub const CREATE_USER_INPUT: Shape = Shape {
  name: "CreateUserInput",
  fields: &[
    Field::required("name", Kind::Text).min(2),
    Field::required("email", Kind::Email),
    Field::required("password", Kind::Text).min(8),
    Field::optional("role", Kind::OneOf(&Role::ALL)),
  ],
};

pub const UPDATE_USER_INPUT: Shape = Shape {
  name: "UpdateUserInput",
  fields: &[
    Field::optional("name", Kind::Text).min(2),
    Field::optional("email", Kind::Email),
    Field::optional("avatar", Kind::Url),
    Field::optional("bio", Kind::Text),
    Field::optional("website", Kind::Url),
    Field::optional("location", Kind::Text),
  ],
};

/// Types that have a shape to be checked against before deserializing.
pub trait Validated: DeserializeOwned {
  const SHAPE: &'static Shape;
}

impl Validated for User {
  const SHAPE: &'static Shape = &USER;
}

impl Validated for UserProfile {
  const SHAPE: &'static Shape = &USER_PROFILE;
}

impl Validated for CreateUserInput {
  const SHAPE: &'static Shape = &CREATE_USER_INPUT;
}

impl Validated for UpdateUserInput {
  const SHAPE: &'static Shape = &UPDATE_USER_INPUT;
}

/// Check `value` against `shape`, reporting every violated field.
pub fn validate(shape: &Shape, value: &Value) -> Result<(), ValidationError> {
  let Some(object) = value.as_object() else {
    return Err(ValidationError::single(
      shape.name,
      "(root)",
      format!("expected object, got {}", type_name(value)),
    ));
  };

  let issues: Vec<FieldIssue> = shape
    .fields
    .iter()
    .filter_map(|field| {
      check_field(field, object).map(|reason| FieldIssue {
        field: field.name.to_string(),
        reason,
      })
    })
    .collect();

  if issues.is_empty() {
    Ok(())
  } else {
    Err(ValidationError {
      shape: shape.name,
      issues,
    })
  }
}

/// Validate then deserialize. Never yields a partially filled value.
pub fn parse<T: Validated>(value: Value) -> Result<T, ValidationError> {
  validate(T::SHAPE, &value)?;
  serde_json::from_value(value)
    .map_err(|e| ValidationError::single(T::SHAPE.name, "(root)", e.to_string()))
}

fn check_field(field: &Field, object: &Map<String, Value>) -> Option<String> {
  let value = match object.get(field.name) {
    None if field.optional => return None,
    None => return Some("required".to_string()),
    Some(v) => v,
  };

  if let Kind::Id = field.kind {
    return match value {
      Value::Number(n) if n.is_i64() || n.is_u64() => None,
      Value::String(s) if !s.is_empty() => None,
      other => Some(format!("expected number or string, got {}", type_name(other))),
    };
  }

  let Some(text) = value.as_str() else {
    return Some(format!("expected string, got {}", type_name(value)));
  };

  if text.chars().count() < field.min_len {
    return Some(format!("below minimum length {}", field.min_len));
  }

  match field.kind {
    Kind::Email if !EMAIL_RE.is_match(text) => Some("invalid format".to_string()),
    Kind::Url if url::Url::parse(text).is_err() => Some("invalid url".to_string()),
    Kind::OneOf(allowed) if !allowed.contains(&text) => {
      Some(format!("expected one of {}", allowed.join(", ")))
    }
    _ => None,
  }
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
