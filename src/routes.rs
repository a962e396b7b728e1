use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{items, whoami};
use crate::middleware::require_auth;
use crate::state::AppState;

/// Assemble the application router. The item resource and the whoami lookup
/// sit behind the auth middleware; the method router returns 405 with an
/// empty body for unsupported verbs on `/items`.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/items",
            get(items::list)
                .post(items::create)
                .patch(items::update)
                .delete(items::remove),
        )
        .route("/auth/whoami", get(whoami::whoami))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(protected)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Achievements API",
        "version": version,
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "items": "/items (protected - GET/POST/PATCH/DELETE)",
            "whoami": "/auth/whoami (protected)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.items.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string()
            })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_state;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn create_assigns_owner_defaults_and_equal_timestamps() {
        let (state, _) = test_state();
        let app = app(state);

        let (status, created) = send(
            &app,
            request("POST", "/items", Some("u1-token"), Some(json!({ "name": "Learn Rust" }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["insertedId"].is_string());

        let (status, listed) = send(&app, request("GET", "/items", Some("u1-token"), None)).await;
        assert_eq!(status, StatusCode::OK);

        let items = listed.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "Learn Rust");
        assert_eq!(items[0]["owner"], "u1");
        assert_eq!(items[0]["completed"], false);
        assert_eq!(items[0]["createdAt"], items[0]["updatedAt"]);
        assert_eq!(items[0]["id"], created["insertedId"]);
    }

    #[tokio::test]
    async fn payload_owner_field_cannot_spoof_ownership() {
        let (state, _) = test_state();
        let app = app(state);

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/items",
                Some("u1-token"),
                Some(json!({ "name": "Mine", "owner": "u2" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, mine) = send(&app, request("GET", "/items", Some("u1-token"), None)).await;
        assert_eq!(mine.as_array().unwrap()[0]["owner"], "u1");

        let (_, theirs) = send(&app, request("GET", "/items", Some("u2-token"), None)).await;
        assert!(theirs.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cross_owner_patch_is_zero_modified_and_leaves_item_unchanged() {
        let (state, _) = test_state();
        let app = app(state);

        let (_, created) = send(
            &app,
            request("POST", "/items", Some("u1-token"), Some(json!({ "name": "Private" }))),
        )
        .await;
        let id = created["insertedId"].as_str().unwrap().to_string();

        let (status, outcome) = send(
            &app,
            request(
                "PATCH",
                &format!("/items?id={}", id),
                Some("u2-token"),
                Some(json!({ "completed": true })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["matchedCount"], 0);
        assert_eq!(outcome["modifiedCount"], 0);

        let (_, listed) = send(&app, request("GET", "/items", Some("u1-token"), None)).await;
        assert_eq!(listed.as_array().unwrap()[0]["completed"], false);
    }

    #[tokio::test]
    async fn owner_patch_modifies_and_restamps_updated_at() {
        let (state, _) = test_state();
        let app = app(state);

        let (_, created) = send(
            &app,
            request("POST", "/items", Some("u1-token"), Some(json!({ "name": "Draft" }))),
        )
        .await;
        let id = created["insertedId"].as_str().unwrap().to_string();

        let (status, outcome) = send(
            &app,
            request(
                "PATCH",
                &format!("/items?id={}", id),
                Some("u1-token"),
                Some(json!({ "completed": true, "description": "done" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["matchedCount"], 1);
        assert_eq!(outcome["modifiedCount"], 1);

        let (_, listed) = send(&app, request("GET", "/items", Some("u1-token"), None)).await;
        let item = &listed.as_array().unwrap()[0];
        assert_eq!(item["completed"], true);
        assert_eq!(item["description"], "done");
        assert!(item["updatedAt"].as_str().unwrap() >= item["createdAt"].as_str().unwrap());
    }

    #[tokio::test]
    async fn missing_or_invalid_credential_is_rejected_with_401() {
        let (state, _) = test_state();
        let app = app(state);

        let (status, body) = send(&app, request("GET", "/items", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert!(body.get("data").is_none());

        let (status, body) =
            send(&app, request("GET", "/items", Some("forged-token"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn unsupported_verb_on_items_is_405_with_empty_body() {
        let (state, _) = test_state();
        let app = app(state);

        let response = app
            .clone()
            .oneshot(request("PUT", "/items", Some("u1-token"), Some(json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn deleting_a_missing_id_twice_is_zero_affected_both_times() {
        let (state, _) = test_state();
        let app = app(state);
        let ghost = bson::oid::ObjectId::new().to_hex();

        for _ in 0..2 {
            let (status, outcome) = send(
                &app,
                request("DELETE", &format!("/items?id={}", ghost), Some("u1-token"), None),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(outcome["deletedCount"], 0);
        }
    }

    #[tokio::test]
    async fn update_and_delete_require_an_id_parameter() {
        let (state, _) = test_state();
        let app = app(state);

        let (status, body) = send(
            &app,
            request("PATCH", "/items", Some("u1-token"), Some(json!({ "completed": true }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field_errors"]["id"], "required");

        let (status, _) = send(&app, request("DELETE", "/items", Some("u1-token"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_id_is_a_field_validation_error() {
        let (state, _) = test_state();
        let app = app(state);

        let (status, body) = send(
            &app,
            request(
                "PATCH",
                "/items?id=not-a-valid-id",
                Some("u1-token"),
                Some(json!({ "completed": true })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["id"].is_string());
    }

    #[tokio::test]
    async fn invalid_create_payload_enumerates_fields_and_persists_nothing() {
        let (state, store) = test_state();
        let app = app(state);

        let (status, body) = send(
            &app,
            request("POST", "/items", Some("u1-token"), Some(json!({ "name": "" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["name"].is_string());

        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn empty_patch_object_is_a_valid_noop_update() {
        let (state, _) = test_state();
        let app = app(state);

        let (_, created) = send(
            &app,
            request("POST", "/items", Some("u1-token"), Some(json!({ "name": "Keep" }))),
        )
        .await;
        let id = created["insertedId"].as_str().unwrap().to_string();

        let (status, outcome) = send(
            &app,
            request("PATCH", &format!("/items?id={}", id), Some("u1-token"), Some(json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["matchedCount"], 1);
    }

    #[tokio::test]
    async fn whoami_resolves_the_calling_subject() {
        let (state, _) = test_state();
        let app = app(state);

        let (status, body) = send(&app, request("GET", "/auth/whoami", Some("u1-token"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["uid"], "u1");
        assert_eq!(body["email"], "u1@example.com");
    }

    #[tokio::test]
    async fn health_reports_ok_over_a_reachable_store() {
        let (state, _) = test_state();
        let app = app(state);

        let (status, body) = send(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
