use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::domain::ports::PaymentGateway;
use crate::errors::AppError;
use crate::infrastructure::store::DieselStore;

use super::identity::AuthenticatedUser;
use super::orders::OrderResponse;

/// POST /orders/{id}/pay
///
/// Sandbox charge path: drives the configured gateway synchronously and
/// applies the matching payment transition. Real gateways report back
/// through the confirm/fail callbacks below instead.
#[utoipa::path(
    post,
    path = "/orders/{id}/pay",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Charge attempted; see payment_status", body = OrderResponse),
        (status = 404, description = "Order absent or not owned by the caller"),
        (status = 409, description = "Order is not chargeable"),
    ),
    tag = "payments"
)]
pub async fn pay(
    orders: web::Data<OrderService<DieselStore>>,
    gateway: web::Data<dyn PaymentGateway>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let orders = orders.into_inner();
    let gateway = gateway.into_inner();
    let order_id = path.into_inner();
    let order =
        web::block(move || orders.capture_payment(order_id, user.0.user_id, gateway.as_ref()))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /payments/{order_id}/confirm
///
/// Payment-collaborator callback for a successful charge. Reached over the
/// internal network, so it carries no end-user identity.
#[utoipa::path(
    post,
    path = "/payments/{order_id}/confirm",
    params(("order_id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Payment confirmed", body = OrderResponse),
        (status = 404, description = "Unknown order"),
        (status = 409, description = "Order or payment already moved on"),
    ),
    tag = "payments"
)]
pub async fn confirm_payment(
    orders: web::Data<OrderService<DieselStore>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let orders = orders.into_inner();
    let order_id = path.into_inner();
    let order = web::block(move || orders.confirm_payment(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /payments/{order_id}/fail
///
/// Payment-collaborator callback for a failed charge. The order itself is
/// left untouched and stays retryable.
#[utoipa::path(
    post,
    path = "/payments/{order_id}/fail",
    params(("order_id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Payment marked failed", body = OrderResponse),
        (status = 404, description = "Unknown order"),
    ),
    tag = "payments"
)]
pub async fn fail_payment(
    orders: web::Data<OrderService<DieselStore>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let orders = orders.into_inner();
    let order_id = path.into_inner();
    let order = web::block(move || orders.fail_payment(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /payments/{order_id}/retry
///
/// Owner-only: resets a FAILED payment back to UNPAID.
#[utoipa::path(
    post,
    path = "/payments/{order_id}/retry",
    params(("order_id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Payment reset to UNPAID", body = OrderResponse),
        (status = 404, description = "Order absent or not owned by the caller"),
        (status = 409, description = "Payment is not FAILED"),
    ),
    tag = "payments"
)]
pub async fn retry_payment(
    orders: web::Data<OrderService<DieselStore>>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let orders = orders.into_inner();
    let order_id = path.into_inner();
    let order = web::block(move || orders.retry_payment(order_id, user.0.user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
