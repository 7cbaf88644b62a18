use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::cart_service::CartService;
use crate::domain::cart::{CartDetail, CartLineDetail};
use crate::errors::AppError;
use crate::infrastructure::store::DieselStore;

use super::identity::AuthenticatedUser;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    /// New quantity for the line; 0 removes it.
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Decimal amount as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
    pub line_subtotal: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartLineResponse>,
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: String,
}

impl From<CartLineDetail> for CartLineResponse {
    fn from(line: CartLineDetail) -> Self {
        Self {
            id: line.line_id,
            product_id: line.product_id,
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price: line.unit_price.to_string(),
            line_subtotal: line.line_subtotal.to_string(),
        }
    }
}

impl From<CartDetail> for CartResponse {
    fn from(cart: CartDetail) -> Self {
        Self {
            id: cart.cart_id,
            items: cart.lines.into_iter().map(Into::into).collect(),
            item_count: cart.summary.item_count,
            total_quantity: cart.summary.total_quantity,
            subtotal: cart.summary.subtotal.to_string(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
///
/// Returns the caller's cart (created lazily) with a summary priced at
/// current catalog prices.
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "The caller's cart", body = CartResponse),
        (status = 401, description = "Missing or malformed identity headers"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    carts: web::Data<CartService<DieselStore>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let carts = carts.into_inner();
    let cart = web::block(move || carts.get_cart(user.0.user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /cart/items
///
/// Adds a product to the cart, merging with an existing line for the same
/// product. The stock check here is advisory; checkout re-validates.
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Unknown product"),
        (status = 409, description = "Not enough stock"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    carts: web::Data<CartService<DieselStore>>,
    user: AuthenticatedUser,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let carts = carts.into_inner();
    let body = body.into_inner();
    let cart = web::block(move || carts.add_item(user.0.user_id, body.product_id, body.quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /cart/items/{line_id}
#[utoipa::path(
    put,
    path = "/cart/items/{line_id}",
    params(("line_id" = Uuid, Path, description = "Cart line UUID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "No such line in the caller's cart"),
    ),
    tag = "cart"
)]
pub async fn update_item(
    carts: web::Data<CartService<DieselStore>>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateItemRequest>,
) -> Result<HttpResponse, AppError> {
    let carts = carts.into_inner();
    let line_id = path.into_inner();
    let quantity = body.into_inner().quantity;
    let cart = web::block(move || carts.update_item(user.0.user_id, line_id, quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /cart/items/{line_id}
#[utoipa::path(
    delete,
    path = "/cart/items/{line_id}",
    params(("line_id" = Uuid, Path, description = "Cart line UUID")),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "No such line in the caller's cart"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    carts: web::Data<CartService<DieselStore>>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let carts = carts.into_inner();
    let line_id = path.into_inner();
    let cart = web::block(move || carts.remove_item(user.0.user_id, line_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /cart
#[utoipa::path(
    delete,
    path = "/cart",
    responses((status = 204, description = "Cart emptied")),
    tag = "cart"
)]
pub async fn clear_cart(
    carts: web::Data<CartService<DieselStore>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let carts = carts.into_inner();
    web::block(move || carts.clear(user.0.user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}
