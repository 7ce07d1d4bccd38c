use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

const BACKTRACE_DEPTH: usize = 5;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{code} - {message}")]
    Expected { code: StatusCode, message: String },
    /// Expected failure that also tells the client where to go next.
    #[error("{code} - {message} -> {location}")]
    Redirect {
        code: StatusCode,
        message: String,
        location: String,
    },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
}

impl ErrorResponse {
    fn json(error: String, redirect: Option<String>) -> Json<Self> {
        Json(Self { error, redirect })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = self.to_string();
        let (code, message) = match self {
            AppError::Expected { code, message } => {
                debug!("{error_message}");
                (code, ErrorResponse::json(message, None))
            }
            AppError::Redirect {
                code,
                message,
                location,
            } => {
                debug!("{error_message}");
                (code, ErrorResponse::json(message, Some(location)))
            }
            AppError::Unexpected(e) => {
                let backtrace = e.backtrace().to_string();
                let filtered_backtrace = backtrace
                    .lines()
                    .take(2 * BACKTRACE_DEPTH)
                    .collect::<Vec<&str>>()
                    .join("\n");
                if filtered_backtrace == "disabled backtrace" {
                    error!("{error_message}");
                } else {
                    error!("{error_message}\n\n{filtered_backtrace}");
                }

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::json("Unexpected server error".into(), None),
                )
            }
        };
        (code, message).into_response()
    }
}

impl AppError {
    pub fn exp(code: StatusCode, message: &str) -> Self {
        Self::Expected {
            code,
            message: message.to_string(),
        }
    }

    pub fn redirect(code: StatusCode, message: &str, location: &str) -> Self {
        Self::Redirect {
            code,
            message: message.to_string(),
            location: location.to_string(),
        }
    }
}
