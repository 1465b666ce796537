use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use auth_otp_actix::config::Config;
use auth_otp_actix::jobs::{email::Mailer, persistent_jobs};
use auth_otp_actix::{routes, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv().ok();

    let config = Config::init()?;

    let mailer = Mailer::new(&config)?;
    let email_sender = match persistent_jobs::start_processing_email_queue(&config, mailer).await
    {
        Ok(email_sender) => email_sender,
        Err(e) => {
            log::error!("Error while starting email queue: {:?}", e);
            return Err(e);
        }
    };

    let app_data = AppState::connect(&config, Arc::new(email_sender)).await?;
    let app_data = web::Data::new(app_data);

    let client_origin = config.client_origin.clone();
    log::info!("Listening on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&client_origin)
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .supports_credentials();

        App::new()
            .app_data(app_data.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind(format!("{}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
