//! # HTTP Routes
//!
//! ```text
//! GET      /health
//! GET/POST /api/products
//! GET/POST /api/categories
//! GET/POST /api/suppliers
//! GET/POST /api/attributes
//! GET      /api/stores/{store_id}/search?q=
//! GET      /api/stores/{store_id}/pos/variants?q=
//! POST     /api/stores/{store_id}/pos/checkout
//! POST     /api/stores/{store_id}/shifts
//! POST     /api/shifts/{shift_id}/close
//! POST     /api/stores/{store_id}/purchases
//! POST     /api/purchases/{purchase_id}/receive
//! POST     /api/stores/{store_id}/refunds
//! POST     /api/stores/{store_id}/stock/adjustments
//! GET/PUT  /api/preferences/{table_id}
//! ```
//!
//! Every `/api` route resolves the principal from `x-user-id` first.

pub mod catalog;
pub mod inventory;
pub mod pos;
pub mod preferences;
pub mod search;
pub mod shifts;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::warn;
use vendorya_db::migrations::migration_status;

use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/products", get(catalog::list_products).post(catalog::create_product))
        .route("/api/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/api/suppliers", get(catalog::list_suppliers).post(catalog::create_supplier))
        .route("/api/attributes", get(catalog::list_attributes).post(catalog::create_attribute))
        .route("/api/stores/{store_id}/search", get(search::global))
        .route("/api/stores/{store_id}/pos/variants", get(pos::variants))
        .route("/api/stores/{store_id}/pos/checkout", post(pos::checkout))
        .route("/api/stores/{store_id}/shifts", post(shifts::open))
        .route("/api/shifts/{shift_id}/close", post(shifts::close))
        .route("/api/stores/{store_id}/purchases", post(inventory::create_purchase))
        .route("/api/purchases/{purchase_id}/receive", post(inventory::receive_purchase))
        .route("/api/stores/{store_id}/refunds", post(inventory::post_refund))
        .route("/api/stores/{store_id}/stock/adjustments", post(inventory::adjust_stock))
        .route("/api/preferences/{table_id}", get(preferences::get).put(preferences::put))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let database = state.db.health_check().await;
    let migrations = match migration_status(state.db.pool()).await {
        Ok((total, applied)) => json!({ "total": total, "applied": applied }),
        Err(e) => {
            warn!(error = %e, "Migration status unavailable");
            Value::Null
        }
    };
    Json(json!({ "status": "ok", "database": database, "migrations": migrations }))
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::USER_ID_HEADER;
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;
    use vendorya_db::seed::{seed_acme, AcmeSeed};
    use vendorya_db::{Database, DbConfig};

    async fn app() -> (Router, Database, AcmeSeed) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let acme = seed_acme(&db).await.unwrap();
        (router(AppState::shared(db.clone())), db, acme)
    }

    async fn send(app: &Router, method: Method, uri: &str, user_id: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(USER_ID_HEADER, user_id);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn checkout_uri(acme: &AcmeSeed) -> String {
        format!("/api/stores/{}/pos/checkout", acme.store.id)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _db, _acme) = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], true);
        assert_eq!(body["migrations"]["total"], body["migrations"]["applied"]);
    }

    #[tokio::test]
    async fn test_checkout_success_shape() {
        let (app, db, acme) = app().await;
        let items = json!({ "items": [{ "id": acme.variant.id, "qty": 2 }] });

        let (status, body) = send(&app, Method::POST, &checkout_uri(&acme), Some(&acme.cashier.user_id), Some(items)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["invoice_number"], 1);
        assert_eq!(body["total"], 100.0);

        let left = db.stock().level(&acme.cashier, &acme.variant.id, &acme.branch.id).await.unwrap();
        assert_eq!(left, 3);
    }

    #[tokio::test]
    async fn test_checkout_failure_statuses() {
        let (app, _db, acme) = app().await;
        let uri = checkout_uri(&acme);

        let (status, body) = send(&app, Method::POST, &uri, Some(&acme.cashier.user_id), Some(json!({ "items": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cart is empty");

        // The owner never opened a shift
        let items = json!({ "items": [{ "id": acme.variant.id, "qty": 1 }] });
        let (status, _) = send(&app, Method::POST, &uri, Some(&acme.owner.user_id), Some(items)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::GET, &uri, Some(&acme.cashier.user_id), None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_checkout_without_customers_is_bad_request() {
        let (app, db, acme) = app().await;
        db.scoped()
            .soft_delete(&acme.owner, vendorya_core::EntityKind::Customer, &acme.customer.id)
            .await
            .unwrap();

        let items = json!({ "items": [{ "id": acme.variant.id, "qty": 1 }] });
        let (status, body) = send(&app, Method::POST, &checkout_uri(&acme), Some(&acme.cashier.user_id), Some(items)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No customers found");
    }

    #[tokio::test]
    async fn test_unknown_or_missing_user_is_unauthorized() {
        let (app, _db, acme) = app().await;
        let uri = format!("/api/stores/{}/search?q=cola", acme.store.id);

        let (status, _) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, Method::GET, &uri, Some("nobody"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_search_endpoints() {
        let (app, _db, acme) = app().await;

        let uri = format!("/api/stores/{}/search?q=cola", acme.store.id);
        let (status, body) = send(&app, Method::GET, &uri, Some(&acme.owner.user_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Products"].as_array().unwrap().len(), 1);

        let uri = format!("/api/stores/{}/pos/variants?q=cola", acme.store.id);
        let (status, body) = send(&app, Method::GET, &uri, Some(&acme.cashier.user_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["stock"], 5);
        assert_eq!(body[0]["price"], 50.0);

        // Live search fires on every keystroke
        let uri = format!("/api/stores/{}/search?q=co", acme.store.id);
        let (status, body) = send(&app, Method::GET, &uri, Some(&acme.owner.user_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Products"], json!([]));
        assert_eq!(body["Customers"], json!([]));

        let uri = format!("/api/stores/{}/pos/variants?q=c", acme.store.id);
        let (status, body) = send(&app, Method::GET, &uri, Some(&acme.cashier.user_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let uri = "/api/stores/some-other-store/search?q=cola";
        let (status, _) = send(&app, Method::GET, uri, Some(&acme.owner.user_id), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_shift_close_and_reopen() {
        let (app, _db, acme) = app().await;

        let uri = format!("/api/shifts/{}/close", acme.shift.id);
        let (status, body) = send(&app, Method::POST, &uri, Some(&acme.cashier.user_id), Some(json!({ "counted_cash": 20_000 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "CLOSED");
        assert_eq!(body["difference"], 0);

        let (status, _) = send(&app, Method::POST, &uri, Some(&acme.cashier.user_id), Some(json!({ "counted_cash": 0 }))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let uri = format!("/api/stores/{}/shifts", acme.store.id);
        let (status, body) = send(&app, Method::POST, &uri, Some(&acme.cashier.user_id), Some(json!({ "starting_cash": 5_000 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["branch_id"], acme.branch.id.as_str());
    }

    #[tokio::test]
    async fn test_purchase_receive_twice_conflicts() {
        let (app, db, acme) = app().await;

        let uri = format!("/api/stores/{}/purchases", acme.store.id);
        let draft = json!({
            "branch_id": acme.branch.id,
            "supplier_id": acme.supplier.id,
            "reference": "PO-1",
            "items": [{ "variant_id": acme.variant.id, "quantity": 4, "unit_cost": 2_500 }]
        });
        let (status, body) = send(&app, Method::POST, &uri, Some(&acme.owner.user_id), Some(draft)).await;
        assert_eq!(status, StatusCode::CREATED);
        let purchase_id = body["id"].as_str().unwrap().to_string();

        let uri = format!("/api/purchases/{}/receive", purchase_id);
        let (status, body) = send(&app, Method::POST, &uri, Some(&acme.owner.user_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "RECEIVED");

        let (status, _) = send(&app, Method::POST, &uri, Some(&acme.owner.user_id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let level = db.stock().level(&acme.owner, &acme.variant.id, &acme.branch.id).await.unwrap();
        assert_eq!(level, 9);
    }

    #[tokio::test]
    async fn test_refund_and_adjustment() {
        let (app, db, acme) = app().await;

        let uri = format!("/api/stores/{}/refunds", acme.store.id);
        let refund = json!({
            "branch_id": null,
            "original_invoice_id": null,
            "reason": "damaged box",
            "items": [{ "variant_id": acme.variant.id, "quantity": 1, "unit_price": 5_000, "restock": true }]
        });
        let (status, body) = send(&app, Method::POST, &uri, Some(&acme.cashier.user_id), Some(refund)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["total_refunded"], 5_000);

        let uri = format!("/api/stores/{}/stock/adjustments", acme.store.id);
        let adjustment = json!({
            "variant_id": acme.variant.id,
            "branch_id": acme.branch.id,
            "quantity_change": -2,
            "reason": "DAMAGE",
            "notes": null
        });
        let (status, _) = send(&app, Method::POST, &uri, Some(&acme.cashier.user_id), Some(adjustment.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, Method::POST, &uri, Some(&acme.owner.user_id), Some(adjustment)).await;
        assert_eq!(status, StatusCode::CREATED);

        let level = db.stock().level(&acme.owner, &acme.variant.id, &acme.branch.id).await.unwrap();
        assert_eq!(level, 4);
    }

    #[tokio::test]
    async fn test_preferences_round_trip() {
        let (app, _db, acme) = app().await;
        let uri = "/api/preferences/products";

        let (status, body) = send(&app, Method::GET, uri, Some(&acme.cashier.user_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["config"].is_null());

        let config = json!({ "columns": ["name", "price"], "sort": "-price" });
        let (status, _) = send(&app, Method::PUT, uri, Some(&acme.cashier.user_id), Some(config.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, Method::GET, uri, Some(&acme.cashier.user_id), None).await;
        assert_eq!(body["config"], config);
    }

    #[tokio::test]
    async fn test_catalog_create_pins_the_callers_store() {
        let (app, _db, acme) = app().await;

        let product = json!({ "store_id": "some-other-store", "name": "Orange Juice 1L", "supplier_id": acme.supplier.id });
        let (status, body) = send(&app, Method::POST, "/api/products", Some(&acme.owner.user_id), Some(product)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["store_id"], acme.store.id.as_str());
        assert_eq!(body["code"], "13002");

        let category = json!({ "store_id": "some-other-store", "name": "Juices", "parent_id": null });
        let (status, body) = send(&app, Method::POST, "/api/categories", Some(&acme.owner.user_id), Some(category)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["store_id"], acme.store.id.as_str());

        let attribute = json!({ "store_id": "some-other-store", "name": "Flavour", "key": "flavour", "input_type": "TEXT" });
        let (status, body) = send(&app, Method::POST, "/api/attributes", Some(&acme.owner.user_id), Some(attribute)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["store_id"], acme.store.id.as_str());

        let (status, body) = send(&app, Method::GET, "/api/products", Some(&acme.cashier.user_id), None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Cola 330ml", "Orange Juice 1L"]);

        let (_, body) = send(&app, Method::GET, "/api/categories", Some(&acme.owner.user_id), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        let (_, body) = send(&app, Method::GET, "/api/attributes", Some(&acme.owner.user_id), None).await;
        assert_eq!(body[0]["key"], "flavour");
    }

    #[tokio::test]
    async fn test_catalog_permissions() {
        let (app, _db, acme) = app().await;

        let supplier = json!({ "store_id": null, "name": "Delta Foods", "contact_info": null, "code_prefix": "21" });
        let (status, _) = send(&app, Method::POST, "/api/suppliers", Some(&acme.cashier.user_id), Some(supplier.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, Method::GET, "/api/suppliers", Some(&acme.cashier.user_id), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, Method::POST, "/api/suppliers", Some(&acme.owner.user_id), Some(supplier)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["store_id"], acme.store.id.as_str());

        let (_, body) = send(&app, Method::GET, "/api/suppliers", Some(&acme.owner.user_id), None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }
}
