use std::fmt;
use thiserror::Error;

/// One violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
  pub field: String,
  pub reason: String,
}

impl fmt::Display for FieldIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.field, self.reason)
  }
}

/// A payload did not match its shape. Lists every violation, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{shape} failed validation: {}", format_issues(.issues))]
pub struct ValidationError {
  pub shape: &'static str,
  pub issues: Vec<FieldIssue>,
}

impl ValidationError {
  pub fn single(shape: &'static str, field: &str, reason: impl Into<String>) -> Self {
    Self {
      shape,
      issues: vec![FieldIssue {
        field: field.to_string(),
        reason: reason.into(),
      }],
    }
  }

  /// Whether `field` is among the violations
  pub fn has_field(&self, field: &str) -> bool {
    self.issues.iter().any(|i| i.field == field)
  }
}

fn format_issues(issues: &[FieldIssue]) -> String {
  issues
    .iter()
    .map(|i| i.to_string())
    .collect::<Vec<_>>()
    .join("; ")
}

/// Every way a call through the users API can fail.
///
/// Cloneable so that one in-flight result can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("no response from server: {message}")]
  Network { message: String },
  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("request setup error: {message}")]
  RequestSetup { message: String },
}

impl ApiError {
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }
}
