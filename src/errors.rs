use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code; clients branch on this, not on the
    /// human-readable message.
    fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL",
            AppError::Domain(e) => match e {
                DomainError::Validation(_) => "VALIDATION",
                DomainError::NotFound(_) => "NOT_FOUND",
                DomainError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
                DomainError::EmptyCart => "EMPTY_CART",
                DomainError::InvalidTransition { .. } => "INVALID_TRANSITION",
                DomainError::Forbidden => "FORBIDDEN",
                DomainError::Conflict(_) => "CONFLICT",
                DomainError::Unavailable(_) => "UNAVAILABLE",
            },
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Domain(e) => match e {
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                DomainError::InsufficientStock { .. } => StatusCode::CONFLICT,
                DomainError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
                DomainError::Forbidden => StatusCode::FORBIDDEN,
                DomainError::Conflict(_) => StatusCode::CONFLICT,
                DomainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        // stock shortfalls carry enough detail for the client to re-fetch
        if let AppError::Domain(DomainError::InsufficientStock {
            product_id,
            available,
        }) = self
        {
            body["product_id"] = json!(product_id);
            body["available"] = json!(available);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::ResponseError;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let err = AppError::from(DomainError::Validation("bad".to_string()));
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::from(DomainError::NotFound("order"));
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "order not found");
    }

    #[test]
    fn stock_and_lifecycle_conflicts_map_to_409() {
        let stock = AppError::from(DomainError::InsufficientStock {
            product_id: Uuid::new_v4(),
            available: 2,
        });
        assert_eq!(stock.error_response().status(), StatusCode::CONFLICT);

        let transition = AppError::from(DomainError::InvalidTransition {
            from: "CANCELLED",
            to: "CANCELLED",
        });
        assert_eq!(transition.error_response().status(), StatusCode::CONFLICT);

        let conflict = AppError::from(DomainError::Conflict("duplicate".to_string()));
        assert_eq!(conflict.error_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn empty_cart_maps_to_422() {
        let err = AppError::from(DomainError::EmptyCart);
        assert_eq!(
            err.error_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn forbidden_maps_to_403() {
        let err = AppError::from(DomainError::Forbidden);
        assert_eq!(err.error_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn unavailable_maps_to_503() {
        let err = AppError::from(DomainError::Unavailable("down".to_string()));
        assert_eq!(
            err.error_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn unauthorized_maps_to_401() {
        assert_eq!(
            AppError::Unauthorized.error_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
