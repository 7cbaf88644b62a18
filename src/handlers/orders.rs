use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::domain::catalog::Address;
use crate::domain::order::{Order, OrderLine, OrderPage};
use crate::errors::AppError;
use crate::infrastructure::store::DieselStore;

use super::identity::AuthenticatedUser;

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingAddressResponse {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl From<Address> for ShippingAddressResponse {
    fn from(address: Address) -> Self {
        Self {
            recipient: address.recipient,
            line1: address.line1,
            line2: address.line2,
            city: address.city,
            postal_code: address.postal_code,
            country: address.country,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price frozen at checkout time, as a decimal string.
    pub unit_price: String,
    pub line_subtotal: String,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price.to_string(),
            line_subtotal: line.line_subtotal.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub notes: Option<String>,
    pub shipping_address: ShippingAddressResponse,
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub total: String,
    pub lines: Vec<OrderLineResponse>,
    pub created_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            status: order.status.as_str().to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            payment_method: order.payment_method,
            notes: order.notes,
            shipping_address: order.shipping_address.into(),
            subtotal: order.subtotal.to_string(),
            tax: order.tax.to_string(),
            shipping: order.shipping.to_string(),
            total: order.total.to_string(),
            lines: order.lines.into_iter().map(Into::into).collect(),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /orders
///
/// Returns a paginated list of the caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    orders: web::Data<OrderService<DieselStore>>,
    user: AuthenticatedUser,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let orders = orders.into_inner();
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result: OrderPage = web::block(move || orders.list_for_user(user.0.user_id, page, limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /orders/{id}
///
/// Owners see their own orders; admins see any.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order absent or not owned by the caller"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    orders: web::Data<OrderService<DieselStore>>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let orders = orders.into_inner();
    let order_id = path.into_inner();
    let order = web::block(move || orders.get(order_id, user.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/cancel
///
/// Owner-only; PENDING orders only. Reserved stock is released in the
/// same transaction.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 404, description = "Order absent or not owned by the caller"),
        (status = 409, description = "Order is past PENDING"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    orders: web::Data<OrderService<DieselStore>>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let orders = orders.into_inner();
    let order_id = path.into_inner();
    let order = web::block(move || orders.cancel(order_id, user.0.user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/refund
///
/// Admin-only; requires a PAID order past confirmation.
#[utoipa::path(
    post,
    path = "/orders/{id}/refund",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order refunded", body = OrderResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Order or payment is not refundable"),
    ),
    tag = "orders"
)]
pub async fn refund_order(
    orders: web::Data<OrderService<DieselStore>>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let orders = orders.into_inner();
    let order_id = path.into_inner();
    let order = web::block(move || orders.refund(order_id, user.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/delivered
///
/// Admin-only fulfilment step for CONFIRMED orders.
#[utoipa::path(
    post,
    path = "/orders/{id}/delivered",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order marked delivered", body = OrderResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Order is not CONFIRMED"),
    ),
    tag = "orders"
)]
pub async fn mark_delivered(
    orders: web::Data<OrderService<DieselStore>>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let orders = orders.into_inner();
    let order_id = path.into_inner();
    let order = web::block(move || orders.mark_delivered(order_id, user.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
