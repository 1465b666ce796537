use derive_more::{Display, From};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::routes::authentication::models::{StatusMessage, UserResponse};

#[derive(Debug, Display, From)]
pub enum ClientError {
    #[display(fmt = "{}", message)]
    #[from(ignore)]
    Api { status: u16, message: String },
    #[display(fmt = "Network error: {}", _0)]
    Transport(reqwest::Error),
}

impl std::error::Error for ClientError {}

/// Thin JSON client for the `/api/v1/auth` endpoints used by the OTP screen.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
    access_token: Option<String>,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/auth{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ClientError> {
        let mut request = self.http.post(self.endpoint(path)).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        decode(response).await
    }

    /// Asks the server to mail a fresh code. Returns the server's message.
    pub async fn generate_otp(&self) -> Result<String, ClientError> {
        let reply: StatusMessage = self.post("/generate-otp", json!({})).await?;
        Ok(reply.message)
    }

    pub async fn verify_otp(&self, code: &str) -> Result<UserResponse, ClientError> {
        self.post("/verify-otp", json!({ "otp": code })).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body["message"]
        .as_str()
        .map(str::to_owned)
        .unwrap_or_else(|| status.to_string());
    log::debug!("Auth API answered {}: {}", status, message);

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
