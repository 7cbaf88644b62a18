use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::checkout_service::CheckoutService;
use crate::errors::AppError;
use crate::infrastructure::store::DieselStore;

use super::identity::AuthenticatedUser;
use super::orders::OrderResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub address_id: Uuid,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// POST /checkout
///
/// Turns the caller's cart into an order. Stock validation, pricing, the
/// order insert, the stock reservation and the cart clear all happen in
/// one transaction; on any failure nothing is persisted.
#[utoipa::path(
    post,
    path = "/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 404, description = "Address absent or not owned by the caller"),
        (status = 409, description = "A line lost the stock race"),
        (status = 422, description = "Cart is empty"),
    ),
    tag = "checkout"
)]
pub async fn checkout(
    checkout: web::Data<CheckoutService<DieselStore>>,
    user: AuthenticatedUser,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let checkout = checkout.into_inner();
    let body = body.into_inner();
    let order = web::block(move || {
        checkout.checkout(
            user.0.user_id,
            body.address_id,
            &body.payment_method,
            body.notes.as_deref(),
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}
