#![allow(dead_code)]

use academy::application::auth::AuthService;
use academy::application::cohorts::CohortService;
use academy::application::enrollment::EnrollmentService;
use academy::domain::payment::ProviderStatus;
use academy::domain::ports::UserStore;
use academy::domain::user::{Email, Role, User};
use academy::infrastructure::in_memory::InMemoryStore;
use academy::infrastructure::sandbox::SandboxProvider;
use academy::infrastructure::signature::WebhookSigner;
use academy::infrastructure::tokens::TokenService;
use academy::interfaces::http::{self, AppState};
use serde_json::Value;
use std::sync::Arc;

pub const WEBHOOK_SECRET: &str = "sk_test_webhook";

/// A server on an ephemeral port, backed by in-memory storage and the
/// sandbox provider. Handles to both are kept so tests can settle payments
/// and inspect state directly.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: InMemoryStore,
    pub provider: SandboxProvider,
    pub signer: WebhookSigner,
    pub tokens: TokenService,
    pub auth: Arc<AuthService>,
}

pub async fn spawn_app() -> TestApp {
    let store = InMemoryStore::new();
    let provider = SandboxProvider::new("http://sandbox.test", ProviderStatus::Pending);
    let tokens = TokenService::new("test-access", "test-refresh");
    let signer = WebhookSigner::new(WEBHOOK_SECRET).unwrap();

    let state = AppState::new(
        EnrollmentService::new(
            Arc::new(store.clone()),
            Arc::new(provider.clone()),
            tokens.clone(),
            "http://app.test/dashboard",
        ),
        AuthService::new(Arc::new(store.clone()), tokens.clone()),
        CohortService::new(Arc::new(store.clone())),
        signer.clone(),
    );
    let auth = state.auth.clone();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(http::serve(listener, state, std::future::pending()));

    TestApp {
        base_url: format!("http://{addr}/api"),
        client: reqwest::Client::new(),
        store,
        provider,
        signer,
        tokens,
        auth,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post(&self, path: &str, body: Value, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    pub async fn patch(&self, path: &str, body: Value, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.patch(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    /// Posts `body` to the webhook, signed with the provider secret.
    pub async fn signed_webhook(&self, body: &Value) -> reqwest::Response {
        let raw = serde_json::to_vec(body).unwrap();
        self.client
            .post(self.url("/payments/webhook"))
            .header("x-paystack-signature", self.signer.sign(&raw))
            .header("content-type", "application/json")
            .body(raw)
            .send()
            .await
            .unwrap()
    }

    /// Registers an account and returns its access token.
    pub async fn register(&self, email: &str) -> String {
        let resp = self
            .post(
                "/auth/register",
                serde_json::json!({"email": email, "password": "password1", "name": "Test"}),
                None,
            )
            .await;
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        body["accessToken"].as_str().unwrap().to_string()
    }

    /// Stores an account with `role` directly and returns an access token for it.
    pub async fn seed_user(&self, email: &str, role: Role) -> (User, String) {
        let mut user = User::new(Email::parse(email).unwrap(), "Seeded", None);
        user.role = role;
        self.store.insert_user(user.clone()).await.unwrap();
        let pair = self.tokens.issue_pair(user.id, user.role).unwrap();
        (user, pair.access_token)
    }

    pub async fn user(&self, email: &str) -> Option<User> {
        self.store
            .find_user_by_email(&Email::parse(email).unwrap())
            .await
            .unwrap()
    }

    /// Starts a public checkout and returns its reference.
    pub async fn public_checkout(&self, email: &str) -> String {
        let resp = self
            .post(
                "/payments/initialize-public",
                serde_json::json!({"email": email, "name": "Payer", "plan": "full"}),
                None,
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["reference"].as_str().unwrap().to_string()
    }
}
