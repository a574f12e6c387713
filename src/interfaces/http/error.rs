use crate::error::{Error, FieldErrors};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// HTTP-facing wrapper over the crate error, mapping each variant to a
/// status code and the response envelope the admin dashboard and gateway
/// callbacks expect.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sponsorship_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Configuration(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::AuthenticationFailed => StatusCode::BAD_REQUEST,
            Error::GatewayRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::OrderNotFound(_) | Error::ApplicationNotFound(_) => StatusCode::NOT_FOUND,
            Error::AmountMismatch { .. } | Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Validation(_) | Error::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        };

        // Internal details (store/config failures) are not echoed to callers.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let (errors, sponsorship_id) = match self.0 {
            Error::Validation(errors) => (Some(errors), None),
            Error::Conflict { existing_id } => (None, Some(existing_id)),
            _ => (None, None),
        };

        let body = ErrorBody {
            success: false,
            message,
            errors,
            sponsorship_id,
        };
        (status, Json(body)).into_response()
    }
}
