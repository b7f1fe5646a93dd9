use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use quillbox::{auth::TokenService, config::Settings, handlers, store, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::from_env().map_err(startup_error)?;
    let store = store::open(&settings).map_err(startup_error)?;
    let state = web::Data::new(AppState::new(store, TokenService::from_settings(&settings)));

    log::info!(
        "starting Notes API {} on {}:{}",
        env!("CARGO_PKG_VERSION"),
        settings.host,
        settings.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await?;

    log::info!("shutting down Notes API");
    Ok(())
}

fn startup_error(err: quillbox::errors::ServerError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("startup failed: {err}"))
}
