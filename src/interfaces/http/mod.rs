//! JSON-over-HTTP surface, mounted under `/api`.

mod auth;
mod cohorts;
mod error;
mod extract;
mod health;
mod logging;
mod payments;
mod students;
mod users;

pub use extract::{AdminUser, ApiJson, ApiPath, ApiQuery, AuthUser, MaybeAuthUser};
pub use logging::REQUEST_ID_HEADER;

use crate::application::auth::AuthService;
use crate::application::cohorts::CohortService;
use crate::application::enrollment::EnrollmentService;
use crate::infrastructure::signature::WebhookSigner;
use axum::routing::{get, patch, post};
use axum::{Router, middleware};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub enrollment: Arc<EnrollmentService>,
    pub auth: Arc<AuthService>,
    pub cohorts: Arc<CohortService>,
    pub webhook_signer: Arc<WebhookSigner>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        enrollment: EnrollmentService,
        auth: AuthService,
        cohorts: CohortService,
        webhook_signer: WebhookSigner,
    ) -> Self {
        Self {
            enrollment: Arc::new(enrollment),
            auth: Arc::new(auth),
            cohorts: Arc::new(cohorts),
            webhook_signer: Arc::new(webhook_signer),
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/password/reset/request", post(auth::request_password_reset))
        .route("/auth/password/reset/confirm", post(auth::confirm_password_reset))
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users/me/password", patch(users::change_password))
        .route("/cohorts", post(cohorts::create).get(cohorts::list))
        .route("/cohorts/:id", get(cohorts::get).patch(cohorts::update))
        .route("/students/:id", patch(students::update))
        .route("/payments/initialize", post(payments::initialize))
        .route("/payments/initialize-public", post(payments::initialize_public))
        .route("/payments/verify", post(payments::verify))
        .route("/payments/webhook", post(payments::webhook))
        .route("/payments/mark-paid", post(payments::mark_paid));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn(logging::trace_requests))
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
