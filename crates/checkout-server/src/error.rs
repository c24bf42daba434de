use actix_web::{HttpResponse, ResponseError};
use stripe_gateway::StripeError;

/// Request-level errors, mapped onto HTTP statuses by the
/// [`ResponseError`] impl so handlers can use `?` throughout.
///
/// The mapping distinguishes "caller sent bad input" (4xx) from
/// "gateway call failed" (502): a gateway rejection of parameters we
/// forwarded is still the caller's fault, a transport failure or
/// gateway 5xx is not.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("unknown payment intent: {0}")]
    UnknownIntent(String),

    #[error("payment intent {id} is {status} and can no longer be updated")]
    IntentClosed { id: String, status: &'static str },

    #[error("gateway error: {0}")]
    Gateway(#[from] StripeError),
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation(msg) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "invalid_request",
                "message": msg
            })),
            ApiError::UnknownIntent(id) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "unknown_intent",
                "message": format!("Payment intent '{}' not found", id)
            })),
            ApiError::IntentClosed { .. } => HttpResponse::Conflict().json(serde_json::json!({
                "error": "intent_closed",
                "message": self.to_string()
            })),
            ApiError::Gateway(e) if e.is_client_error() => {
                tracing::warn!(error = %e, "gateway rejected forwarded request");
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "gateway_rejected",
                    "message": e.to_string()
                }))
            }
            ApiError::Gateway(e) => {
                tracing::error!(error = %e, "gateway call failed");
                HttpResponse::BadGateway().json(serde_json::json!({
                    "error": "gateway_error",
                    "message": "Payment gateway call failed"
                }))
            }
        }
    }
}

/// Classify a retrieve failure: a 404 from the gateway means the
/// caller referenced an intent that does not exist.
pub fn retrieve_error(id: &str, err: StripeError) -> ApiError {
    if err.is_not_found() {
        ApiError::UnknownIntent(id.to_string())
    } else {
        ApiError::Gateway(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_404_becomes_unknown_intent() {
        let err = retrieve_error(
            "pi_missing",
            StripeError::Api {
                status: 404,
                code: Some("resource_missing".to_string()),
                message: "No such payment_intent".to_string(),
            },
        );
        assert!(matches!(err, ApiError::UnknownIntent(id) if id == "pi_missing"));
    }

    #[test]
    fn transport_failure_stays_gateway_error() {
        let err = retrieve_error("pi_1", StripeError::Http("timeout".to_string()));
        assert!(matches!(err, ApiError::Gateway(_)));
    }

    #[test]
    fn status_codes_match_taxonomy() {
        use actix_web::http::StatusCode;

        let validation = ApiError::Validation("currency is required".to_string());
        assert_eq!(
            validation.error_response().status(),
            StatusCode::BAD_REQUEST
        );

        let unknown = ApiError::UnknownIntent("pi_x".to_string());
        assert_eq!(unknown.error_response().status(), StatusCode::NOT_FOUND);

        let closed = ApiError::IntentClosed {
            id: "pi_x".to_string(),
            status: "succeeded",
        };
        assert_eq!(closed.error_response().status(), StatusCode::CONFLICT);

        let rejected = ApiError::Gateway(StripeError::Api {
            status: 400,
            code: None,
            message: "bad currency".to_string(),
        });
        assert_eq!(rejected.error_response().status(), StatusCode::BAD_REQUEST);

        let down = ApiError::Gateway(StripeError::Http("refused".to_string()));
        assert_eq!(down.error_response().status(), StatusCode::BAD_GATEWAY);
    }
}
