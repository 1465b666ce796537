use actix_web::{
    cookie::{time::Duration as ActixWebDuration, Cookie},
    web, HttpRequest, HttpResponse,
};
use chrono::Utc;

use super::models::{
    ForgotPasswordPayload, LoginUserPayload, RegisterUserPayload, ResetPasswordPayload,
    StatusMessage, UpdatePasswordPayload, UserResponse, VerifyOtpPayload,
};
use crate::auth::flows;
use crate::errors::CustomError;
use crate::jwt_auth_middleware::JwtMiddleware;
use crate::token::{generate_jwt_token, generate_tokens, verify_jwt_token};
use crate::AppState;

fn session_cookie<'c>(name: &'c str, value: String, max_age_minutes: i64, http_only: bool) -> Cookie<'c> {
    Cookie::build(name, value)
        .path("/")
        .max_age(ActixWebDuration::new(max_age_minutes * 60, 0))
        .http_only(http_only)
        .finish()
}

fn expired_cookie(name: &str) -> Cookie<'_> {
    Cookie::build(name, "")
        .path("/")
        .max_age(ActixWebDuration::new(-1, 0))
        .http_only(true)
        .finish()
}

pub async fn register_user_handler(
    body: web::Json<RegisterUserPayload>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    let body = body.into_inner();
    let user = flows::register(&data, &body.full_name, &body.email, &body.password, Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

pub async fn login_user_handler(
    body: web::Json<LoginUserPayload>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    let user = flows::login(&data, &body.email, &body.password).await?;

    let tokens = match generate_tokens(user.id, &data.env) {
        Ok(tokens) => tokens,
        Err(e) => {
            log::error!("Error while generating tokens: {}", e);
            return Err(CustomError::InternalError);
        }
    };
    let (Some(access_token), Some(refresh_token)) =
        (tokens.access_token.token, tokens.refresh_token.token)
    else {
        return Err(CustomError::InternalError);
    };

    data.sessions
        .save(tokens.access_token.token_uuid, user.id, data.env.access_token_max_age)
        .await?;
    data.sessions
        .save(tokens.refresh_token.token_uuid, user.id, data.env.refresh_token_max_age)
        .await?;

    flows::notify_login(&data, &user, Utc::now()).await;

    let access_cookie = session_cookie(
        "access_token",
        access_token.clone(),
        data.env.access_token_max_age,
        true,
    );
    let refresh_cookie = session_cookie(
        "refresh_token",
        refresh_token,
        data.env.refresh_token_max_age,
        true,
    );
    let logged_in_cookie = session_cookie(
        "logged_in",
        "true".to_string(),
        data.env.access_token_max_age,
        false,
    );

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .cookie(logged_in_cookie)
        .json(serde_json::json!({"status": "success", "access_token": access_token})))
}

pub async fn check_handler(jwt_guard: JwtMiddleware) -> UserResponse {
    jwt_guard.user.into()
}

pub async fn logout_handler(
    req: HttpRequest,
    auth_guard: JwtMiddleware,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    let mut revoked = vec![auth_guard.access_token_uuid];

    // the refresh session is dropped too when the browser still holds it
    if let Some(refresh_token) = req.cookie("refresh_token") {
        match verify_jwt_token(&data.env.refresh_token_public_key, refresh_token.value()) {
            Ok(details) => revoked.push(details.token_uuid),
            Err(e) => log::info!("Ignoring invalid refresh token on logout: {}", e),
        }
    }

    data.sessions.revoke(&revoked).await?;

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie("access_token"))
        .cookie(expired_cookie("refresh_token"))
        .cookie(expired_cookie("logged_in"))
        .json(serde_json::json!({"status": "success"})))
}

pub async fn refresh_access_token_handler(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    let message = "could not refresh access token";

    let refresh_token = match req.cookie("refresh_token") {
        Some(c) => c.value().to_string(),
        None => {
            log::info!("Refresh token not found");
            return Err(CustomError::bad_request(message));
        }
    };

    let refresh_token_details =
        match verify_jwt_token(&data.env.refresh_token_public_key, &refresh_token) {
            Ok(token_details) => token_details,
            Err(e) => {
                log::info!("Error while verifying refresh token: {}", e);
                return Err(CustomError::bad_request(message));
            }
        };

    let user_id = data
        .sessions
        .user_for(refresh_token_details.token_uuid)
        .await?
        .ok_or_else(|| CustomError::bad_request(message))?;

    let user = match data.store.find_by_id(user_id).await? {
        Some(user) => user,
        None => {
            log::error!("User not found");
            return Err(CustomError::bad_request(message));
        }
    };

    let access_token_details = match generate_jwt_token(
        user.id,
        data.env.access_token_max_age,
        &data.env.access_token_private_key,
    ) {
        Ok(token_details) => token_details,
        Err(e) => {
            log::error!("Error while generating access token: {}", e);
            return Err(CustomError::InternalError);
        }
    };
    let access_token = access_token_details
        .token
        .ok_or(CustomError::InternalError)?;

    data.sessions
        .save(
            access_token_details.token_uuid,
            user.id,
            data.env.access_token_max_age,
        )
        .await?;

    let access_cookie = session_cookie(
        "access_token",
        access_token.clone(),
        data.env.access_token_max_age,
        true,
    );
    let logged_in_cookie = session_cookie(
        "logged_in",
        "true".to_string(),
        data.env.access_token_max_age,
        false,
    );

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(logged_in_cookie)
        .json(serde_json::json!({"status": "success", "access_token": access_token})))
}

pub async fn update_password_handler(
    auth_guard: JwtMiddleware,
    body: web::Json<UpdatePasswordPayload>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    flows::update_password(
        &data,
        &auth_guard.user,
        &body.current_password,
        &body.new_password,
    )
    .await?;
    Ok(HttpResponse::Ok().json(StatusMessage::success("Password updated successfully")))
}

pub async fn verify_email_handler(
    token: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    let user = flows::verify_email(&data, &token, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

pub async fn resend_verification_handler(
    auth_guard: JwtMiddleware,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    flows::issue_verification_link(&data, &auth_guard.user, Utc::now()).await?;
    Ok(HttpResponse::Accepted().json(StatusMessage::success("Verification email sent")))
}

pub async fn generate_otp_handler(
    auth_guard: JwtMiddleware,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    flows::issue_otp(&data, &auth_guard.user, Utc::now()).await?;
    Ok(HttpResponse::Accepted().json(StatusMessage::success("OTP sent to your email")))
}

pub async fn verify_otp_handler(
    auth_guard: JwtMiddleware,
    body: web::Json<VerifyOtpPayload>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    let user = flows::verify_otp(&data, auth_guard.user.id, &body.otp, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

pub async fn forgot_password_handler(
    body: web::Json<ForgotPasswordPayload>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    flows::request_password_reset(&data, &body.email, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(StatusMessage::success(
        "If that email is registered, a reset link has been sent",
    )))
}

pub async fn reset_password_handler(
    token: web::Path<String>,
    body: web::Json<ResetPasswordPayload>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CustomError> {
    flows::reset_password(&data, &token, &body.new_password, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(StatusMessage::success("Password reset successfully")))
}
