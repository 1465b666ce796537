use actix_web::{web, HttpResponse, Responder};
pub mod authentication;
use crate::routes::authentication::routes as auth_routes;

async fn health_checker_handler() -> impl Responder {
    const MESSAGE: &str = "Up and running!";

    HttpResponse::Ok().json(serde_json::json!({"message": MESSAGE}))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health-checker", web::get().to(health_checker_handler))
        .service(web::scope("/api/v1").configure(user_routes));
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/register")
                    .route(web::post().to(auth_routes::register_user_handler)),
            )
            .service(
                web::resource("/login").route(web::post().to(auth_routes::login_user_handler)),
            )
            .service(web::resource("/logout").route(web::post().to(auth_routes::logout_handler)))
            .service(
                web::resource("/refresh")
                    .route(web::get().to(auth_routes::refresh_access_token_handler)),
            )
            .service(web::resource("/check").route(web::get().to(auth_routes::check_handler)))
            .service(
                web::resource("/update-password")
                    .route(web::post().to(auth_routes::update_password_handler)),
            )
            .service(
                web::resource("/verify-email/{token}")
                    .route(web::get().to(auth_routes::verify_email_handler)),
            )
            .service(
                web::resource("/resend-verification")
                    .route(web::post().to(auth_routes::resend_verification_handler)),
            )
            .service(
                web::resource("/generate-otp")
                    .route(web::post().to(auth_routes::generate_otp_handler)),
            )
            .service(
                web::resource("/verify-otp").route(web::post().to(auth_routes::verify_otp_handler)),
            )
            .service(
                web::resource("/forgot-password")
                    .route(web::post().to(auth_routes::forgot_password_handler)),
            )
            .service(
                web::resource("/reset-password/{token}")
                    .route(web::post().to(auth_routes::reset_password_handler)),
            ),
    );
}
