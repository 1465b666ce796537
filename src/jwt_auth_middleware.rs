use actix_web::{dev::Payload, http::header, web, Error as ActixWebError, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use uuid::Uuid;

use crate::errors::CustomError;
use crate::repository::models::User;
use crate::token::verify_jwt_token;
use crate::AppState;

/// Extractor guarding authenticated routes. The access token is read from the
/// `access_token` cookie, falling back to an `Authorization: Bearer` header.
pub struct JwtMiddleware {
    pub user: User,
    pub access_token_uuid: Uuid,
}

fn access_token(req: &HttpRequest) -> Option<String> {
    req.cookie("access_token")
        .map(|c| c.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::to_owned)
        })
}

impl FromRequest for JwtMiddleware {
    type Error = ActixWebError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let data = req.app_data::<web::Data<AppState>>().cloned();
        let token = access_token(req);

        Box::pin(async move {
            let data = data.ok_or(CustomError::InternalError)?;
            let token = token.ok_or(CustomError::Unauthorized)?;

            let access_token_details =
                match verify_jwt_token(&data.env.access_token_public_key, &token) {
                    Ok(token_details) => token_details,
                    Err(e) => {
                        log::info!("Rejected access token: {}", e);
                        return Err(CustomError::Unauthorized.into());
                    }
                };

            let user_id = data
                .sessions
                .user_for(access_token_details.token_uuid)
                .await?
                .filter(|user_id| *user_id == access_token_details.user_id)
                .ok_or(CustomError::Unauthorized)?;

            let user = data
                .store
                .find_by_id(user_id)
                .await?
                .ok_or(CustomError::Unauthorized)?;

            Ok::<_, ActixWebError>(JwtMiddleware {
                user,
                access_token_uuid: access_token_details.token_uuid,
            })
        })
    }
}
