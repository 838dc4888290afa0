mod common;

use academy::domain::payment::PaymentStatus;
use academy::domain::ports::PaymentStore;
use academy::domain::user::Role;
use common::spawn_app;
use serde_json::json;

fn charge_success(reference: &str) -> serde_json::Value {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "status": "success",
            "receipt_url": "https://receipts.test/1"
        }
    })
}

#[tokio::test]
async fn test_signed_charge_success_settles_payment() {
    let app = spawn_app().await;
    let reference = app.public_checkout("hook@example.com").await;

    let resp = app.signed_webhook(&charge_success(&reference)).await;
    assert_eq!(resp.status(), 200);

    let payment = app.store.get_payment(&reference).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(payment.receipt_url.as_deref(), Some("https://receipts.test/1"));
    assert_eq!(app.user("hook@example.com").await.unwrap().role, Role::Student);

    // Replays are acknowledged and change nothing.
    let resp = app.signed_webhook(&charge_success(&reference)).await;
    assert_eq!(resp.status(), 200);
    let replayed = app.store.get_payment(&reference).await.unwrap().unwrap();
    assert_eq!(replayed, payment);
}

#[tokio::test]
async fn test_tampered_signature_is_rejected_without_state_change() {
    let app = spawn_app().await;
    let reference = app.public_checkout("hook@example.com").await;

    let raw = serde_json::to_vec(&charge_success(&reference)).unwrap();
    let mut signature = app.signer.sign(&raw);
    signature.replace_range(0..2, if signature.starts_with("00") { "11" } else { "00" });

    let resp = app
        .client
        .post(app.url("/payments/webhook"))
        .header("x-paystack-signature", signature)
        .body(raw.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert!(resp.bytes().await.unwrap().is_empty());

    let resp = app
        .client
        .post(app.url("/payments/webhook"))
        .body(raw)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let payment = app.store.get_payment(&reference).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(app.user("hook@example.com").await.unwrap().role, Role::Applicant);
}

#[tokio::test]
async fn test_unknown_reference_and_other_events_are_acknowledged() {
    let app = spawn_app().await;
    let resp = app.signed_webhook(&charge_success("no-such-ref")).await;
    assert_eq!(resp.status(), 200);

    let resp = app
        .signed_webhook(&json!({"event": "transfer.success", "data": {"reference": "x"}}))
        .await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_signed_but_malformed_event_is_bad_request() {
    let app = spawn_app().await;
    let resp = app.signed_webhook(&json!({"data": {}})).await;
    assert_eq!(resp.status(), 400);

    let resp = app
        .signed_webhook(&json!({"event": "charge.success", "data": {"status": "success"}}))
        .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_webhook_and_verify_race_applies_once() {
    let app = spawn_app().await;
    let reference = app.public_checkout("race@example.com").await;
    app.provider
        .settle(&reference, academy::domain::payment::ProviderStatus::Success)
        .await;

    let hook = charge_success(&reference);
    let (webhook, verify) = tokio::join!(
        app.signed_webhook(&hook),
        app.post("/payments/verify", json!({"reference": reference}), None),
    );
    assert_eq!(webhook.status(), 200);
    assert_eq!(verify.status(), 200);

    let payment = app.store.get_payment(&reference).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(app.user("race@example.com").await.unwrap().role, Role::Student);
}
