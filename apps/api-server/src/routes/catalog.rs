//! Tenant-scoped catalog resources: products, categories, suppliers and
//! attribute definitions.
//!
//! Lists only ever show the caller's store. On create, a `store_id` in the
//! body is honoured for superusers only; everyone else gets their own store.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use vendorya_core::catalog::{AttributeDefinition, Category, NewAttributeDefinition, NewProduct, Product, Supplier};
use vendorya_core::EntityKind;

use crate::error::ApiResult;
use crate::extract::CurrentPrincipal;
use crate::state::SharedState;

/// Rows returned by one list call.
const LIST_LIMIT: i64 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Superusers only.
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewCategoryRequest {
    pub store_id: Option<String>,
    pub name: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewSupplierRequest {
    pub store_id: Option<String>,
    pub name: String,
    pub contact_info: Option<String>,
    pub code_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct NewAttributeRequest {
    pub store_id: Option<String>,
    #[serde(flatten)]
    pub definition: NewAttributeDefinition,
}

/// `GET /api/products`
pub async fn list_products(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Product>>> {
    let rows = state
        .db
        .scoped()
        .list::<Product>(&principal, EntityKind::Product, params.include_deleted, LIST_LIMIT)
        .await?;
    Ok(Json(rows))
}

/// `POST /api/products`
pub async fn create_product(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(input): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.db.catalog().create_product(&principal, &input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /api/categories`
pub async fn list_categories(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Category>>> {
    let rows = state
        .db
        .scoped()
        .list::<Category>(&principal, EntityKind::Category, params.include_deleted, LIST_LIMIT)
        .await?;
    Ok(Json(rows))
}

/// `POST /api/categories`
pub async fn create_category(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(input): Json<NewCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state
        .db
        .catalog()
        .create_category(&principal, input.store_id.as_deref(), &input.name, input.parent_id.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `GET /api/suppliers`
pub async fn list_suppliers(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Supplier>>> {
    let rows = state
        .db
        .scoped()
        .list::<Supplier>(&principal, EntityKind::Supplier, params.include_deleted, LIST_LIMIT)
        .await?;
    Ok(Json(rows))
}

/// `POST /api/suppliers`
pub async fn create_supplier(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(input): Json<NewSupplierRequest>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let supplier = state
        .db
        .catalog()
        .create_supplier(
            &principal,
            input.store_id.as_deref(),
            &input.name,
            input.contact_info.as_deref(),
            &input.code_prefix,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// `GET /api/attributes`
pub async fn list_attributes(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<AttributeDefinition>>> {
    let rows = state
        .db
        .scoped()
        .list::<AttributeDefinition>(&principal, EntityKind::AttributeDefinition, params.include_deleted, LIST_LIMIT)
        .await?;
    Ok(Json(rows))
}

/// `POST /api/attributes`
pub async fn create_attribute(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(input): Json<NewAttributeRequest>,
) -> ApiResult<(StatusCode, Json<AttributeDefinition>)> {
    let definition = state
        .db
        .catalog()
        .create_attribute_definition(&principal, input.store_id.as_deref(), &input.definition)
        .await?;
    Ok((StatusCode::CREATED, Json(definition)))
}
