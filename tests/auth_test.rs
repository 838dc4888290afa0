mod common;

use academy::domain::user::Role;
use common::spawn_app;
use serde_json::{Value, json};

#[tokio::test]
async fn test_register_login_and_me() {
    let app = spawn_app().await;
    let resp = app
        .post(
            "/auth/register",
            json!({"email": "New@Example.com", "password": "password1", "name": "New", "role": "ADMIN"}),
            None,
        )
        .await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["role"], "APPLICANT");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["refreshToken"].is_string());

    let resp = app
        .post(
            "/auth/register",
            json!({"email": "new@example.com", "password": "password1", "name": "Again"}),
            None,
        )
        .await;
    assert_eq!(resp.status(), 409);

    let resp = app
        .post(
            "/auth/login",
            json!({"email": "new@example.com", "password": "password1"}),
            None,
        )
        .await;
    assert_eq!(resp.status(), 200);
    let tokens: Value = resp.json().await.unwrap();
    let access = tokens["accessToken"].as_str().unwrap();

    let me: Value = app.get("/users/me", Some(access)).await.json().await.unwrap();
    assert_eq!(me["user"]["name"], "New");
    assert!(me["profile"]["studentIdCode"].is_string());

    let resp = app
        .post(
            "/auth/login",
            json!({"email": "new@example.com", "password": "wrong-password"}),
            None,
        )
        .await;
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let app = spawn_app().await;
    let resp = app.get("/users/me", None).await;
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "Unauthorized");

    let resp = app
        .client
        .get(app.url("/users/me"))
        .header("authorization", "Basic abc")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_refresh_rotation_and_logout() {
    let app = spawn_app().await;
    let registered: Value = app
        .post(
            "/auth/register",
            json!({"email": "r@example.com", "password": "password1", "name": "R"}),
            None,
        )
        .await
        .json()
        .await
        .unwrap();
    let original = registered["refreshToken"].as_str().unwrap().to_string();

    let resp = app
        .post("/auth/refresh", json!({"refreshToken": original}), None)
        .await;
    assert_eq!(resp.status(), 200);
    let rotated: Value = resp.json().await.unwrap();
    let rotated = rotated["refreshToken"].as_str().unwrap().to_string();

    let resp = app
        .post("/auth/refresh", json!({"refreshToken": original}), None)
        .await;
    assert_eq!(resp.status(), 401);

    let resp = app
        .post("/auth/logout", json!({"refreshToken": rotated}), None)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);

    let resp = app
        .post("/auth/refresh", json!({"refreshToken": rotated}), None)
        .await;
    assert_eq!(resp.status(), 401);

    let resp = app.post("/auth/logout", json!({}), None).await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_payment_first_account_sets_password() {
    let app = spawn_app().await;
    let (_, token) = app.seed_user("payer@example.com", Role::Student).await;

    let resp = app
        .client
        .patch(app.url("/users/me/password"))
        .bearer_auth(&token)
        .json(&json!({"newPassword": "first-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .post(
            "/auth/login",
            json!({"email": "payer@example.com", "password": "first-password"}),
            None,
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .patch(app.url("/users/me/password"))
        .bearer_auth(&token)
        .json(&json!({"currentPassword": "nope-nope", "newPassword": "second-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let app = spawn_app().await;
    let resp = app
        .client
        .post(app.url("/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "ValidationError");
}

#[tokio::test]
async fn test_health_and_request_id() {
    let app = spawn_app().await;
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status(), 200);
    let generated = resp.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(generated.len(), 36);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert!(body["uptimeSecs"].is_u64());
    assert!(body["pid"].is_u64());

    let resp = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "trace-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "trace-123");
}

#[tokio::test]
async fn test_update_own_name() {
    let app = spawn_app().await;
    let token = app.register("named@example.com").await;

    let resp = app
        .patch("/users/me", json!({"name": "Grace Hopper"}), Some(&token))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["name"], "Grace Hopper");
    assert_eq!(body["user"]["role"], "APPLICANT");
    assert!(body["user"].get("passwordHash").is_none());

    let me: Value = app.get("/users/me", Some(&token)).await.json().await.unwrap();
    assert_eq!(me["user"]["name"], "Grace Hopper");

    let resp = app.patch("/users/me", json!({"name": "  "}), Some(&token)).await;
    assert_eq!(resp.status(), 400);
    let resp = app.patch("/users/me", json!({"name": "X"}), None).await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_password_reset_request_and_confirm() {
    let app = spawn_app().await;
    app.register("forgetful@example.com").await;

    // Unknown and known accounts get the same answer.
    for email in ["nobody@example.com", "forgetful@example.com"] {
        let resp = app
            .post("/auth/password/reset/request", json!({"email": email}), None)
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["message"], "Password reset email sent");
    }
    let resp = app
        .post("/auth/password/reset/request", json!({"email": "nope"}), None)
        .await;
    assert_eq!(resp.status(), 400);

    let token = app
        .auth
        .request_password_reset("forgetful@example.com")
        .await
        .unwrap()
        .unwrap();

    let resp = app
        .post(
            "/auth/password/reset/confirm",
            json!({"token": "made-up", "newPassword": "brand-new-pass"}),
            None,
        )
        .await;
    assert_eq!(resp.status(), 400);

    let confirm = json!({"token": token, "newPassword": "brand-new-pass"});
    let resp = app
        .post("/auth/password/reset/confirm", confirm.clone(), None)
        .await;
    assert_eq!(resp.status(), 200);

    let resp = app
        .post(
            "/auth/login",
            json!({"email": "forgetful@example.com", "password": "brand-new-pass"}),
            None,
        )
        .await;
    assert_eq!(resp.status(), 200);

    // Single use.
    let resp = app.post("/auth/password/reset/confirm", confirm, None).await;
    assert_eq!(resp.status(), 400);
}
