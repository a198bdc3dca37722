//! End-to-end tests over the HTTP surface, driving the router directly.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use cardbox::auth::TokenGenerator;
use cardbox::server::{AppState, create_router};
use cardbox::store::{SqliteStore, Store};
use cardbox::types::Token;

struct TestServer {
    _temp: TempDir,
    router: Router,
    state: Arc<AppState>,
    admin_token: String,
}

impl TestServer {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let generator = TokenGenerator::new();
        let (raw_token, lookup, hash) = generator.generate().unwrap();
        store
            .create_token(&Token {
                id: Uuid::new_v4().to_string(),
                token_hash: hash,
                token_lookup: lookup,
                is_admin: true,
                user_id: None,
                created_at: Utc::now(),
                expires_at: None,
                last_used_at: None,
            })
            .unwrap();

        let state = Arc::new(AppState {
            store: Arc::new(store),
        });
        let router = create_router(state.clone());

        Self {
            _temp: temp,
            router,
            state,
            admin_token: raw_token,
        }
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));

        let request = match body {
            Some(json_body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json_body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Provisions one user in the tenant and returns (user_id, user_token).
    async fn provision_user(&self, tenant: &str, name: &str, role: &str) -> (String, String) {
        let (status, body) = self
            .request(
                "POST",
                "/api/v1/admin/users",
                &self.admin_token,
                Some(json!({ "tenant_id": tenant, "name": name, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let user_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .request(
                "POST",
                "/api/v1/admin/tokens",
                &self.admin_token,
                Some(json!({ "user_id": user_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let token = body["data"]["token"].as_str().unwrap().to_string();

        (user_id, token)
    }

    async fn provision_tenant(&self, name: &str, tier: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/v1/admin/tenants",
                &self.admin_token,
                Some(json!({ "name": name, "tier": tier })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::new();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_requires_authentication() {
    let server = TestServer::new();
    let request = Request::builder()
        .uri("/api/v1/categories")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_token_cannot_call_admin_routes() {
    let server = TestServer::new();
    let tenant = server.provision_tenant("acme", "free").await;
    let (_user_id, token) = server.provision_user(&tenant, "alice", "member").await;

    let (status, _) = server
        .request(
            "POST",
            "/api/v1/admin/tenants",
            &token,
            Some(json!({ "name": "rogue" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_review_schedule_progression() {
    let server = TestServer::new();
    let tenant = server.provision_tenant("acme", "free").await;
    let (_user_id, token) = server.provision_user(&tenant, "alice", "member").await;

    let (status, body) = server
        .request(
            "POST",
            "/api/v1/categories",
            &token,
            Some(json!({ "name": "geography" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .request(
            "POST",
            "/api/v1/cards",
            &token,
            Some(json!({
                "category_id": category_id,
                "question": "Capital of France?",
                "answer": "Paris"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let card_id = body["data"]["id"].as_str().unwrap().to_string();

    let mut intervals = Vec::new();
    for _ in 0..3 {
        let (status, body) = server
            .request(
                "POST",
                "/api/v1/reviews",
                &token,
                Some(json!({ "card_id": card_id, "feedback": "good" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        intervals.push(body["data"]["interval_days"].as_i64().unwrap());
    }

    assert_eq!(intervals, vec![1, 1, 6]);
}

#[tokio::test]
async fn test_duplicate_card_conflicts() {
    let server = TestServer::new();
    let tenant = server.provision_tenant("acme", "free").await;
    let (_user_id, token) = server.provision_user(&tenant, "alice", "member").await;

    let (_, body) = server
        .request(
            "POST",
            "/api/v1/categories",
            &token,
            Some(json!({ "name": "geography" })),
        )
        .await;
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let card = json!({
        "category_id": category_id,
        "question": "Capital of  France?",
        "answer": "Paris",
        "difficulty": 3
    });
    let (status, body) = server
        .request("POST", "/api/v1/cards", &token, Some(card))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let card_id = body["data"]["id"].as_str().unwrap().to_string();

    // Difficulty persists as a number.
    let (_, body) = server
        .request("GET", &format!("/api/v1/cards/{card_id}"), &token, None)
        .await;
    assert_eq!(body["data"]["difficulty"], 3);

    // Same content modulo whitespace and case.
    let near_duplicate = json!({
        "category_id": category_id,
        "question": "capital of france?",
        "answer": "  PARIS  "
    });
    let (status, _) = server
        .request("POST", "/api/v1/cards", &token, Some(near_duplicate))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_batch_create_reports_duplicates() {
    let server = TestServer::new();
    let tenant = server.provision_tenant("acme", "free").await;
    let (_user_id, token) = server.provision_user(&tenant, "alice", "member").await;

    let (_, body) = server
        .request(
            "POST",
            "/api/v1/categories",
            &token,
            Some(json!({ "name": "geography" })),
        )
        .await;
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .request(
            "POST",
            &format!("/api/v1/categories/{category_id}/cards"),
            &token,
            Some(json!({
                "cards": [
                    { "question": "Q1", "answer": "A1" },
                    { "question": "Q2", "answer": "A2" },
                    { "question": "q1", "answer": "a1" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["created"], 2);
    assert_eq!(body["data"]["skipped_duplicates"], 1);
    assert_eq!(body["data"]["truncated"], 0);
}

#[tokio::test]
async fn test_deck_quota_enforced() {
    let server = TestServer::new();
    // Free tier allows 3 decks.
    let tenant = server.provision_tenant("acme", "free").await;
    let (_user_id, token) = server.provision_user(&tenant, "alice", "member").await;

    for i in 0..3 {
        let (status, body) = server
            .request(
                "POST",
                "/api/v1/decks",
                &token,
                Some(json!({ "name": format!("deck {i}") })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, _) = server
        .request(
            "POST",
            "/api/v1/decks",
            &token,
            Some(json!({ "name": "one too many" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_accept_shared_deck_copies_and_isolates() {
    let server = TestServer::new();
    let tenant = server.provision_tenant("acme", "pro").await;
    let (_owner_id, owner_token) = server.provision_user(&tenant, "alice", "member").await;
    let (acceptor_id, acceptor_token) = server.provision_user(&tenant, "bob", "member").await;

    let (_, body) = server
        .request(
            "POST",
            "/api/v1/categories",
            &owner_token,
            Some(json!({ "name": "geography" })),
        )
        .await;
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let mut card_ids = Vec::new();
    for (q, a, public) in [
        ("Q1", "A1", true),
        ("Q2", "A2", true),
        ("Q3", "A3", false),
    ] {
        let (status, body) = server
            .request(
                "POST",
                "/api/v1/cards",
                &owner_token,
                Some(json!({
                    "category_id": category_id,
                    "question": q,
                    "answer": a,
                    "is_public": public
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        card_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let (status, body) = server
        .request(
            "POST",
            "/api/v1/decks",
            &owner_token,
            Some(json!({ "name": "capitals", "card_ids": card_ids })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let deck_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .request(
            "POST",
            "/api/v1/decks/share",
            &owner_token,
            Some(json!({ "deck_ids": [deck_id], "recipients": [acceptor_id] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["shared_decks"], 1);
    assert_eq!(body["data"]["recipients"], 1);

    // Accepting a deck you already own is rejected outright.
    let (status, _) = server
        .request(
            "POST",
            &format!("/api/v1/decks/{deck_id}/accept"),
            &owner_token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .request(
            "POST",
            &format!("/api/v1/decks/{deck_id}/accept"),
            &acceptor_token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    // The private card is silently dropped from the copy.
    assert_eq!(body["data"]["accepted_card_count"], 2);
    let copy_id = body["data"]["deck"]["id"].as_str().unwrap().to_string();
    assert_ne!(copy_id, deck_id);

    // Renaming the copy leaves the source untouched.
    let (status, _) = server
        .request(
            "PATCH",
            &format!("/api/v1/decks/{copy_id}"),
            &acceptor_token,
            Some(json!({ "name": "my capitals" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server
        .request(
            "GET",
            &format!("/api/v1/decks/{deck_id}"),
            &owner_token,
            None,
        )
        .await;
    assert_eq!(body["data"]["name"], "capitals");

    // The acceptor cannot modify the source deck.
    let (status, _) = server
        .request(
            "PATCH",
            &format!("/api/v1/decks/{deck_id}"),
            &acceptor_token,
            Some(json!({ "name": "hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_share_all_makes_deck_public() {
    let server = TestServer::new();
    let tenant = server.provision_tenant("acme", "pro").await;
    let (_owner_id, owner_token) = server.provision_user(&tenant, "alice", "member").await;
    let (_other_id, other_token) = server.provision_user(&tenant, "bob", "member").await;

    let (_, body) = server
        .request(
            "POST",
            "/api/v1/decks",
            &owner_token,
            Some(json!({ "name": "capitals" })),
        )
        .await;
    let deck_id = body["data"]["id"].as_str().unwrap().to_string();

    // Not visible before sharing.
    let (status, _) = server
        .request("GET", &format!("/api/v1/decks/{deck_id}"), &other_token, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .request(
            "POST",
            "/api/v1/decks/share",
            &owner_token,
            Some(json!({ "deck_ids": [deck_id], "recipients": "all" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .request("GET", &format!("/api/v1/decks/{deck_id}"), &other_token, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_public"], true);
}

#[tokio::test]
async fn test_priority_resolution_and_suggestions() {
    let server = TestServer::new();
    let tenant = server.provision_tenant("acme", "pro").await;
    let (_admin_id, admin_token) = server.provision_user(&tenant, "carol", "admin").await;
    let (_user_id, user_token) = server.provision_user(&tenant, "alice", "member").await;

    let (_, body) = server
        .request(
            "POST",
            "/api/v1/categories",
            &user_token,
            Some(json!({ "name": "geography" })),
        )
        .await;
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    // Default priority is 5.
    let (_, body) = server
        .request("GET", "/api/v1/priorities", &user_token, None)
        .await;
    assert_eq!(body["data"][0]["priority"], 5);

    // Tenant default set by the admin.
    let (status, _) = server
        .request(
            "PUT",
            "/api/v1/priorities/default",
            &admin_token,
            Some(json!({ "category_id": category_id, "priority": 8 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server
        .request("GET", "/api/v1/priorities", &user_token, None)
        .await;
    assert_eq!(body["data"][0]["priority"], 8);

    // Personal override wins over the tenant default; the stored
    // record is echoed back.
    let (status, body) = server
        .request(
            "PUT",
            "/api/v1/priorities",
            &user_token,
            Some(json!({ "category_id": category_id, "priority": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category_id"], category_id.as_str());
    assert_eq!(body["data"]["priority"], 2);

    let (_, body) = server
        .request("GET", "/api/v1/priorities", &user_token, None)
        .await;
    assert_eq!(body["data"][0]["priority"], 2);

    // Members cannot touch the tenant default or suggestions.
    let (status, _) = server
        .request(
            "PUT",
            "/api/v1/priorities/default",
            &user_token,
            Some(json!({ "category_id": category_id, "priority": 9 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Build enough struggling history for a suggestion: 3 cards with
    // many failed reviews each.
    let (_, body) = server
        .request(
            "POST",
            &format!("/api/v1/categories/{category_id}/cards"),
            &user_token,
            Some(json!({
                "cards": [
                    { "question": "Q1", "answer": "A1" },
                    { "question": "Q2", "answer": "A2" },
                    { "question": "Q3", "answer": "A3" }
                ]
            })),
        )
        .await;
    assert_eq!(body["data"]["created"], 3);

    let (_, body) = server
        .request(
            "GET",
            &format!("/api/v1/categories/{category_id}/cards"),
            &user_token,
            None,
        )
        .await;
    let card_ids: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(card_ids.len(), 3);

    for card_id in &card_ids {
        for _ in 0..6 {
            let (status, _) = server
                .request(
                    "POST",
                    "/api/v1/reviews",
                    &user_token,
                    Some(json!({ "card_id": card_id, "feedback": "hard" })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    let (status, body) = server
        .request("POST", "/api/v1/suggestions/generate", &admin_token, None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let suggestions = body["data"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["category_id"], *category_id);
    assert_eq!(suggestions[0]["current_priority"], 8);
    assert_eq!(suggestions[0]["suggested_priority"], 10);

    // Re-running while one is open creates nothing new.
    let (_, body) = server
        .request("POST", "/api/v1/suggestions/generate", &admin_token, None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Applying moves the tenant default.
    let id = suggestions[0]["id"].as_str().unwrap();
    let (status, _) = server
        .request(
            "POST",
            &format!("/api/v1/suggestions/{id}/apply"),
            &admin_token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .request(
            "POST",
            &format!("/api/v1/suggestions/{id}/apply"),
            &admin_token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_limits_endpoint_reflects_admin_overrides() {
    let server = TestServer::new();
    let tenant = server.provision_tenant("acme", "starter").await;
    let (_user_id, token) = server.provision_user(&tenant, "alice", "member").await;

    let (status, body) = server.request("GET", "/api/v1/limits", &token, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["tier"], "starter");
    assert_eq!(body["data"]["max_decks"], 10);
    assert_eq!(body["data"]["max_cards_per_deck"], 200);

    let (status, _) = server
        .request(
            "PUT",
            "/api/v1/admin/limits/starter",
            &server.admin_token,
            Some(json!({ "max_decks": -1, "max_cards_per_deck": 300 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server.request("GET", "/api/v1/limits", &token, None).await;
    assert_eq!(body["data"]["max_decks"], -1);
    assert_eq!(body["data"]["max_cards_per_deck"], 300);
}

#[tokio::test]
async fn test_cross_tenant_isolation() {
    let server = TestServer::new();
    let tenant_a = server.provision_tenant("acme", "free").await;
    let tenant_b = server.provision_tenant("globex", "free").await;
    let (_a_id, a_token) = server.provision_user(&tenant_a, "alice", "member").await;
    let (_b_id, b_token) = server.provision_user(&tenant_b, "bob", "member").await;

    let (_, body) = server
        .request(
            "POST",
            "/api/v1/categories",
            &a_token,
            Some(json!({ "name": "geography" })),
        )
        .await;
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = server
        .request(
            "POST",
            "/api/v1/cards",
            &a_token,
            Some(json!({
                "category_id": category_id,
                "question": "Q1",
                "answer": "A1",
                "is_public": true
            })),
        )
        .await;
    let card_id = body["data"]["id"].as_str().unwrap().to_string();

    // Another tenant sees neither the category nor the card.
    let (_, body) = server
        .request("GET", "/api/v1/categories", &b_token, None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = server
        .request(
            "POST",
            "/api/v1/reviews",
            &b_token,
            Some(json!({ "card_id": card_id, "feedback": "good" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_accessible_from_state() {
    // Library consumers hold the store through AppState.
    let server = TestServer::new();
    assert!(server.state.store.has_admin_token().unwrap());
}
