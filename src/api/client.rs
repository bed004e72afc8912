use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::auth::{CredentialProvider, SessionHandler};
use crate::config::ApiConfig;

use super::error::{ApiError, ValidationError};
use super::types::ErrorBody;

/// HTTP client for the users API.
///
/// Every request gets the stored bearer token attached, and every failure
/// is logged and then returned to the caller unchanged in kind.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: String,
  login_path: String,
  credentials: Arc<dyn CredentialProvider>,
  session: Arc<dyn SessionHandler>,
}

impl ApiClient {
  pub fn new(
    config: &ApiConfig,
    credentials: Arc<dyn CredentialProvider>,
    session: Arc<dyn SessionHandler>,
  ) -> Result<Self, ApiError> {
    url::Url::parse(&config.base_url).map_err(|e| {
      setup_error(format!("invalid base url '{}': {}", config.base_url, e))
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .timeout(Duration::from_millis(config.timeout_ms))
      .default_headers(headers)
      .build()
      .map_err(|e| setup_error(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      login_path: config.login_path.clone(),
      credentials,
      session,
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
    self.send(Method::GET, path, None).await
  }

  pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
    let body = encode_body(body)?;
    self.send(Method::POST, path, Some(body)).await
  }

  pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
    let body = encode_body(body)?;
    self.send(Method::PATCH, path, Some(body)).await
  }

  pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
    self.send(Method::DELETE, path, None).await.map(|_| ())
  }

  async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
    let url = format!("{}{}", self.base_url, path);

    let mut builder = self.http.request(method.clone(), &url);
    if let Some(token) = self.credentials.token() {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &body {
      builder = builder.json(body);
    }

    debug!("[API Request] {} {}", method, path);

    let request = builder.build().map_err(|e| {
      error!("Request setup error: {}", e);
      setup_error(e.to_string())
    })?;

    let response = match self.http.execute(request).await {
      Ok(response) => response,
      Err(e) if e.is_builder() => {
        error!("Request setup error: {}", e);
        return Err(setup_error(e.to_string()));
      }
      Err(e) => {
        error!("No response from server");
        return Err(ApiError::Network {
          message: e.to_string(),
        });
      }
    };

    let status = response.status();
    if !status.is_success() {
      // An unreadable error body still leaves the status to report
      let text = response.text().await.unwrap_or_default();
      return Err(self.http_failure(status, &text));
    }

    debug!("[API Response] {} {}", status.as_u16(), url);

    let bytes = response.bytes().await.map_err(|e| {
      error!("No response from server");
      ApiError::Network {
        message: e.to_string(),
      }
    })?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
      return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|e| {
      ValidationError::single("response", "(body)", format!("invalid JSON: {}", e)).into()
    })
  }

  /// Log an error status and apply its side effects, then hand back the error.
  fn http_failure(&self, status: StatusCode, body: &str) -> ApiError {
    let message = server_message(status, body);

    if status == StatusCode::UNAUTHORIZED {
      warn!("{}", failure_diagnostic(status, &message));
      self.credentials.clear();
      self.session.login_required(&self.login_path);
    } else {
      error!("{}", failure_diagnostic(status, &message));
    }

    ApiError::Http {
      status: status.as_u16(),
      message,
    }
  }
}

impl std::fmt::Debug for ApiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ApiClient")
      .field("base_url", &self.base_url)
      .field("login_path", &self.login_path)
      .finish_non_exhaustive()
  }
}

fn setup_error(message: String) -> ApiError {
  ApiError::RequestSetup { message }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
  serde_json::to_value(body).map_err(|e| {
    error!("Request setup error: {}", e);
    setup_error(format!("failed to encode body: {}", e))
  })
}

/// Message the server put in its error body, or a generic one for the status.
fn server_message(status: StatusCode, body: &str) -> String {
  serde_json::from_str::<ErrorBody>(body)
    .map(|b| b.message)
    .unwrap_or_else(|_| {
      status
        .canonical_reason()
        .map(String::from)
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()))
    })
}

/// Diagnostic line for an error status.
pub(crate) fn failure_diagnostic(status: StatusCode, message: &str) -> String {
  match status.as_u16() {
    401 => format!("Unauthorized: {}", message),
    403 => format!("Access forbidden: {}", message),
    404 => format!("Resource not found: {}", message),
    500 => format!("Server error: {}", message),
    _ => format!("API Error: {}", message),
  }
}
