//! Request client and resource function tests against a mocked users API.
//!
//! These tests use mockito to mock HTTP API responses.

mod common;

use mockito::{Matcher, Server};
use serde_json::json;

use roster::api::{ApiError, CreateUserInput, Role, UpdateUserInput, UserId, UsersApi};
use roster::auth::CredentialProvider;

use common::{fixture, fixture_for, user_json, users_api, users_json};

#[tokio::test]
async fn test_bearer_token_is_attached() {
  let mut server = Server::new_async().await;
  let m = server
    .mock("GET", "/users/1")
    .match_header("authorization", "Bearer T")
    .with_status(200)
    .with_header("content-type", "application/json")
    .with_body(user_json(1, "Ada"))
    .expect(1)
    .create_async()
    .await;

  let fx = fixture(&server, Some("T"));
  fx.client.get("/users/1").await.expect("request should succeed");

  m.assert_async().await;
}

#[tokio::test]
async fn test_no_token_means_no_authorization_header() {
  let mut server = Server::new_async().await;
  let m = server
    .mock("GET", "/users/1")
    .match_header("authorization", Matcher::Missing)
    .match_header("content-type", "application/json")
    .with_status(200)
    .with_body(user_json(1, "Ada"))
    .expect(1)
    .create_async()
    .await;

  let fx = fixture(&server, None);
  fx.client.get("/users/1").await.expect("request should succeed");

  m.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_clears_token_and_requests_login() {
  let mut server = Server::new_async().await;
  let _m = server
    .mock("GET", "/users")
    .with_status(401)
    .with_body(r#"{"message":"Token expired"}"#)
    .create_async()
    .await;

  let fx = fixture(&server, Some("expired-token"));
  let err = fx.client.get("/users").await.unwrap_err();

  assert_eq!(
    err,
    ApiError::Http {
      status: 401,
      message: "Token expired".into()
    }
  );
  assert_eq!(fx.credentials.token(), None);
  assert_eq!(*fx.session.redirects.lock(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_other_error_statuses_are_reraised_with_server_message() {
  let mut server = Server::new_async().await;

  for (status, message) in [
    (403, "Forbidden here"),
    (404, "User not found"),
    (500, "Internal Server Error"),
    (418, "I'm a teapot"),
  ] {
    let path = format!("/status/{}", status);
    let _m = server
      .mock("GET", path.as_str())
      .with_status(status)
      .with_header("content-type", "application/json")
      .with_body(json!({ "message": message }).to_string())
      .create_async()
      .await;

    let fx = fixture(&server, Some("T"));
    let err = fx.client.get(&path).await.unwrap_err();

    assert_eq!(
      err,
      ApiError::Http {
        status: status as u16,
        message: message.to_string()
      }
    );
    // Only a 401 touches the stored token
    assert_eq!(fx.credentials.token().as_deref(), Some("T"));
    assert!(fx.session.redirects.lock().is_empty());
  }
}

#[tokio::test]
async fn test_list_server_error_surfaces_status_and_message() {
  let mut server = Server::new_async().await;
  let _m = server
    .mock("GET", "/users")
    .with_status(500)
    .with_header("content-type", "application/json")
    .with_body(r#"{"message":"Internal Server Error"}"#)
    .create_async()
    .await;

  let err = users_api(&server).list().await.unwrap_err();
  assert_eq!(
    err,
    ApiError::Http {
      status: 500,
      message: "Internal Server Error".into()
    }
  );
}

#[tokio::test]
async fn test_no_response_is_network_error() {
  // Grab a free port and close it again so nothing is listening
  let port = {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
  };

  let fx = fixture_for(&format!("http://127.0.0.1:{}", port), None);
  let err = UsersApi::new(fx.client).list().await.unwrap_err();
  assert!(matches!(err, ApiError::Network { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_unbuildable_request_is_setup_error() {
  let server = Server::new_async().await;
  // Header values cannot carry newlines
  let fx = fixture(&server, Some("bad\ntoken"));
  let err = fx.client.get("/users").await.unwrap_err();
  assert!(matches!(err, ApiError::RequestSetup { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_list_preserves_order() {
  let mut server = Server::new_async().await;
  let _m = server
    .mock("GET", "/users")
    .with_status(200)
    .with_body(users_json(&[(3, "Carol"), (1, "Ada"), (2, "Bob")]))
    .create_async()
    .await;

  let users = users_api(&server).list().await.unwrap();
  let ids: Vec<UserId> = users.into_iter().map(|u| u.id).collect();
  assert_eq!(ids, vec![UserId::Number(3), UserId::Number(1), UserId::Number(2)]);
}

#[tokio::test]
async fn test_list_with_one_invalid_element_fails() {
  let mut server = Server::new_async().await;
  let body = json!([
    serde_json::from_str::<serde_json::Value>(&user_json(1, "Ada")).unwrap(),
    { "id": 2, "name": "Bob", "email": "bob", "role": "owner", "createdAt": "x", "updatedAt": "y" }
  ]);
  let _m = server
    .mock("GET", "/users")
    .with_status(200)
    .with_body(body.to_string())
    .create_async()
    .await;

  match users_api(&server).list().await {
    Err(ApiError::Validation(e)) => {
      assert!(e.has_field("email"));
      assert!(e.has_field("role"));
    }
    other => panic!("expected validation error, got {:?}", other),
  }
}

#[tokio::test]
async fn test_list_rejects_non_array_body() {
  let mut server = Server::new_async().await;
  let _m = server
    .mock("GET", "/users")
    .with_status(200)
    .with_body(r#"{"users": []}"#)
    .create_async()
    .await;

  let err = users_api(&server).list().await.unwrap_err();
  assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn test_get_missing_user_is_404() {
  let mut server = Server::new_async().await;
  let _m = server
    .mock("GET", "/users/99")
    .with_status(404)
    .with_body(r#"{"message":"User not found"}"#)
    .create_async()
    .await;

  let err = users_api(&server).get(99).await.unwrap_err();
  assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_get_with_malformed_user_fails_validation() {
  let mut server = Server::new_async().await;
  let _m = server
    .mock("GET", "/users/1")
    .with_status(200)
    .with_body(r#"{"id": 1, "name": "Ada"}"#)
    .create_async()
    .await;

  let err = users_api(&server).get(1).await.unwrap_err();
  match err {
    ApiError::Validation(e) => {
      assert!(e.has_field("email"));
      assert!(e.has_field("role"));
      assert!(e.has_field("createdAt"));
    }
    other => panic!("expected validation error, got {:?}", other),
  }
}

#[tokio::test]
async fn test_get_profile() {
  let mut server = Server::new_async().await;
  let _m = server
    .mock("GET", "/users/1/profile")
    .with_status(200)
    .with_body(
      json!({
        "id": 1,
        "name": "Ada",
        "email": "ada@example.com",
        "role": "admin",
        "createdAt": "2024-01-01",
        "updatedAt": "2024-01-01",
        "bio": "Analyst",
        "website": "https://ada.dev",
        "location": "London"
      })
      .to_string(),
    )
    .create_async()
    .await;

  let profile = users_api(&server).get_profile(1).await.unwrap();
  assert_eq!(profile.user.role, Role::Admin);
  assert_eq!(profile.website.as_deref(), Some("https://ada.dev"));
}

#[tokio::test]
async fn test_create_sends_input_and_validates_response() {
  let mut server = Server::new_async().await;
  let m = server
    .mock("POST", "/users")
    .match_body(Matcher::Json(json!({
      "name": "Grace",
      "email": "grace@example.com",
      "password": "correct-horse"
    })))
    .with_status(201)
    .with_body(user_json(7, "Grace"))
    .expect(1)
    .create_async()
    .await;

  let input = CreateUserInput {
    name: "Grace".into(),
    email: "grace@example.com".into(),
    password: "correct-horse".into(),
    role: None,
  };
  let user = users_api(&server).create(&input).await.unwrap();

  assert_eq!(user.id, UserId::Number(7));
  m.assert_async().await;
}

#[tokio::test]
async fn test_create_rejected_by_server() {
  let mut server = Server::new_async().await;
  let _m = server
    .mock("POST", "/users")
    .with_status(400)
    .with_body(r#"{"message":"Name and email are required"}"#)
    .create_async()
    .await;

  let input = CreateUserInput {
    name: String::new(),
    email: String::new(),
    password: String::new(),
    role: None,
  };
  let err = users_api(&server).create(&input).await.unwrap_err();
  assert_eq!(
    err,
    ApiError::Http {
      status: 400,
      message: "Name and email are required".into()
    }
  );
}

#[tokio::test]
async fn test_update_sends_only_present_fields() {
  let mut server = Server::new_async().await;
  let m = server
    .mock("PATCH", "/users/1")
    .match_body(Matcher::Json(json!({ "name": "Ada King" })))
    .with_status(200)
    .with_body(user_json(1, "Ada King"))
    .expect(1)
    .create_async()
    .await;

  let input = UpdateUserInput {
    name: Some("Ada King".into()),
    ..Default::default()
  };
  let user = users_api(&server).update(1, &input).await.unwrap();

  assert_eq!(user.name, "Ada King");
  m.assert_async().await;
}

#[tokio::test]
async fn test_delete_resolves_with_empty_body() {
  let mut server = Server::new_async().await;
  let m = server
    .mock("DELETE", "/users/1")
    .with_status(204)
    .expect(1)
    .create_async()
    .await;

  users_api(&server).delete(1).await.unwrap();
  m.assert_async().await;
}

#[tokio::test]
async fn test_delete_missing_user_is_404() {
  let mut server = Server::new_async().await;
  let _m = server
    .mock("DELETE", "/users/5")
    .with_status(404)
    .with_body(r#"{"message":"User not found"}"#)
    .create_async()
    .await;

  let err = users_api(&server).delete(5).await.unwrap_err();
  assert_eq!(err.status(), Some(404));
}
