use crate::repository::models::User;
use actix_web::{body::BoxBody, HttpRequest, HttpResponse, Responder};
use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginUserPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UserResponse {
    pub id: uuid::Uuid,
    pub full_name: String,
    pub email: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Responder for UserResponse {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> actix_web::HttpResponse<Self::Body> {
        let body = serde_json::to_string(&self);
        match body {
            Ok(body) => HttpResponse::Ok()
                .content_type("application/json")
                .body(body),

            Err(e) => HttpResponse::InternalServerError()
                .content_type("application/json")
                .body(format!("{{\"error\": \"{}\"}}", e)),
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            verified: user.verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterUserPayload {
    #[serde(alias = "fullName")]
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdatePasswordPayload {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VerifyOtpPayload {
    pub otp: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ForgotPasswordPayload {
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResetPasswordPayload {
    pub new_password: String,
}

/// Plain acknowledgement body shared by the endpoints that return no data.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}
