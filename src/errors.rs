use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use derive_more::{Display, Error};

/// errors visible by the user
#[derive(Debug, Display, Error, PartialEq)]
pub enum CustomError {
    #[display(fmt = "Bad Request: {}.", message)]
    BadRequest { message: String },
    #[display(fmt = "Invalid email or password")]
    InvalidCredentials,
    #[display(fmt = "Invalid verification code")]
    InvalidCode,
    #[display(fmt = "Verification code has expired. Please request a new one")]
    ExpiredCode,
    #[display(fmt = "Token is invalid or has already been used")]
    TokenNotFound,
    #[display(fmt = "You are not logged in or your session has expired")]
    Unauthorized,
    #[display(fmt = "Failed to send email. Please try again later.")]
    MailDeliveryFailure,
    #[display(fmt = "An internal error occurred. Please try again later.")]
    InternalError,
}

impl CustomError {
    pub fn bad_request(message: impl Into<String>) -> CustomError {
        CustomError::BadRequest {
            message: message.into(),
        }
    }

    pub fn convert_to_user_error(e: sqlx::Error) -> CustomError {
        match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                CustomError::bad_request("Email already exists")
            }
            e => {
                log::error!("database error: {:?}", e);
                CustomError::InternalError
            }
        }
    }
}

impl ResponseError for CustomError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({"status": "fail", "message": self.to_string()}))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            CustomError::BadRequest { .. }
            | CustomError::InvalidCredentials
            | CustomError::InvalidCode
            | CustomError::ExpiredCode => StatusCode::BAD_REQUEST,
            CustomError::TokenNotFound => StatusCode::NOT_FOUND,
            CustomError::Unauthorized => StatusCode::UNAUTHORIZED,
            CustomError::MailDeliveryFailure => StatusCode::BAD_GATEWAY,
            CustomError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for CustomError {
    fn from(e: sqlx::Error) -> CustomError {
        CustomError::convert_to_user_error(e)
    }
}

impl From<redis::RedisError> for CustomError {
    fn from(e: redis::RedisError) -> CustomError {
        log::error!("redis error: {:?}", e);
        CustomError::InternalError
    }
}
