pub mod health;
pub mod payment;

pub mod error {
    use actix_web::body::BoxBody;
    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, HttpResponseBuilder, ResponseError};
    use serde_json::json;
    use std::fmt;

    use remindpay_common::service::payment::PaymentError;

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(String),

        // 401
        IncorrectCredential(String),

        // 404
        DoesNotExist(String),

        // 500
        InternalError(String),
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                HttpErrorResponse::IncorrectlyFormed(msg) => {
                    write!(f, "Incorrectly formed request: {msg}")
                }
                HttpErrorResponse::IncorrectCredential(msg) => {
                    write!(f, "Incorrect credential: {msg}")
                }
                HttpErrorResponse::DoesNotExist(msg) => {
                    write!(f, "Does not exist: {msg}")
                }
                HttpErrorResponse::InternalError(msg) => {
                    write!(f, "Internal error: {msg}")
                }
            }
        }
    }

    impl ResponseError for HttpErrorResponse {
        fn status_code(&self) -> StatusCode {
            match self {
                HttpErrorResponse::IncorrectlyFormed(_) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::IncorrectCredential(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::DoesNotExist(_) => StatusCode::NOT_FOUND,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }

        fn error_response(&self) -> HttpResponse<BoxBody> {
            HttpResponseBuilder::new(self.status_code()).json(json!({
                "error": self.to_string(),
            }))
        }
    }

    impl From<PaymentError> for HttpErrorResponse {
        fn from(error: PaymentError) -> Self {
            match error {
                PaymentError::InvalidAmount(amount) => HttpErrorResponse::IncorrectlyFormed(
                    format!("Payment amount must be positive, got {amount}"),
                ),
                PaymentError::InvalidPeriod(days) => HttpErrorResponse::IncorrectlyFormed(
                    format!("Premium period must be positive, got {days}"),
                ),
                PaymentError::NotFound(payment_id) => {
                    HttpErrorResponse::DoesNotExist(format!("No payment with id {payment_id}"))
                }
                PaymentError::StoreFailure(e) => {
                    log::error!("{e}");
                    HttpErrorResponse::InternalError(String::from("Failed to access payment"))
                }
            }
        }
    }
}
