//! Drives the webhook router end to end with an in-memory registry.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use listener::{build_router, AppState, SignatureVerifier, SIGNATURE_HEADER};
use reconciler::{InMemoryRegistry, Operation};
use secrecy::SecretString;
use serde_json::json;
use sha1::{Digest, Sha1};
use tower::ServiceExt;
use twin::{Device, DeviceId, ReconcilerConfig, RegistryConnector};

const SECRET: &str = "dt-secret";

struct FakeConnector {
    registry: Arc<InMemoryRegistry>,
    authenticated: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("token endpoint unavailable")]
struct Unavailable;

#[async_trait]
impl RegistryConnector for FakeConnector {
    type Registry = Arc<InMemoryRegistry>;
    type Error = Unavailable;

    async fn connect(&self) -> Result<Self::Registry, Self::Error> {
        if self.authenticated {
            Ok(Arc::clone(&self.registry))
        } else {
            Err(Unavailable)
        }
    }
}

fn roster() -> Vec<Device> {
    vec![Device::new(DeviceId::new("abc").unwrap()).with_label("name", "Room1")]
}

fn router(registry: Arc<InMemoryRegistry>, secret: Option<&str>, authenticated: bool) -> Router {
    let verifier = SignatureVerifier::new(secret.map(|s| SecretString::from(s.to_string())));
    build_router(AppState::new(
        FakeConnector {
            registry,
            authenticated,
        },
        verifier,
        ReconcilerConfig::default(),
    ))
}

fn sign(body: &[u8]) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({"checksum": hex::encode(Sha1::digest(body))}),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn delivery_body(event: serde_json::Value, labels: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&json!({"event": event, "labels": labels})).unwrap()
}

fn spawn_body() -> Vec<u8> {
    delivery_body(
        json!({
            "eventId": "evt-1",
            "targetName": "projects/p1/devices/abc",
            "eventType": "labelsChanged",
            "data": {"added": {"inertia-model": "0.5"}, "modified": {}, "removed": []}
        }),
        json!({"name": "Room1", "inertia-model": "0.5"}),
    )
}

fn signed_request(body: Vec<u8>) -> Request<Body> {
    Request::post("/")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, sign(&body))
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = router(Arc::new(InMemoryRegistry::new(roster())), Some(SECRET), true);
    let request = Request::get("/healthz").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&body).unwrap(),
        json!({"status": "ok"})
    );
}

#[tokio::test]
async fn signed_delivery_spawns_twin() {
    let registry = Arc::new(InMemoryRegistry::new(roster()));
    let app = router(Arc::clone(&registry), Some(SECRET), true);

    let (status, body) = send(app, signed_request(spawn_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert_eq!(registry.count(Operation::Create), 1);
    let twin = registry
        .devices()
        .into_iter()
        .find(|d| d.id.has_prefix("emu"))
        .unwrap();
    assert_eq!(twin.labels.get("name"), Some("Room1 twin"));
    assert_eq!(twin.labels.get("original_device_id"), Some("abc"));
}

#[tokio::test]
async fn skipped_event_type_is_acknowledged() {
    let registry = Arc::new(InMemoryRegistry::new(roster()));
    let app = router(Arc::clone(&registry), Some(SECRET), true);
    let body = delivery_body(
        json!({
            "eventId": "evt-2",
            "targetName": "projects/p1/devices/abc",
            "eventType": "networkStatus",
            "data": {"networkStatus": {"signalStrength": 80}}
        }),
        json!({}),
    );

    let (status, body) = send(app, signed_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "skipped event type networkStatus");
    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let registry = Arc::new(InMemoryRegistry::new(roster()));
    let app = router(Arc::clone(&registry), Some(SECRET), true);
    let request = Request::post("/").body(Body::from(spawn_body())).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "missing header");
    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn unconfigured_secret_rejects_everything() {
    let app = router(Arc::new(InMemoryRegistry::new(roster())), None, true);

    let (status, body) = send(app, signed_request(spawn_body())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "missing secret");
}

#[tokio::test]
async fn tampered_body_fails_checksum() {
    let app = router(Arc::new(InMemoryRegistry::new(roster())), Some(SECRET), true);
    let signature = sign(&spawn_body());
    let request = Request::post("/")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(delivery_body(json!({}), json!({}))))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "checksum mismatch");
}

#[tokio::test]
async fn undecodable_delivery_is_invalid_payload() {
    let app = router(Arc::new(InMemoryRegistry::new(roster())), Some(SECRET), true);

    let (status, body) = send(app, signed_request(b"{\"labels\": {}}".to_vec())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "invalid payload");
}

#[tokio::test]
async fn failed_authentication_answers_401() {
    let registry = Arc::new(InMemoryRegistry::new(roster()));
    let app = router(Arc::clone(&registry), Some(SECRET), false);

    let (status, body) = send(app, signed_request(spawn_body())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Not Authenticated");
    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn registry_failure_status_is_mirrored() {
    let registry = Arc::new(InMemoryRegistry::new(roster()));
    registry.fail(Operation::List, 503);
    let app = router(Arc::clone(&registry), Some(SECRET), true);

    let (status, body) = send(app, signed_request(spawn_body())).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "ERROR: could not list devices");
}
