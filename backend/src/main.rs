mod classify;
mod config;
mod dataset;
mod routes;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use classify::decider::Classifier;
use classify::predictor::Predictor;
use config::Config;
use dataset::hub_client::HubClient;
use dataset::resolver::DatasetService;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = Config::from_env();
    log::info!("Dataset hub: {}", config.hub_base_url);
    log::info!("Dataset cache directory: {}", config.dataset_cache_dir.display());

    // Services are built once here and injected into handlers; nothing holds
    // process-wide mutable state.
    let predictor = Predictor::new(Classifier::new());
    let hub_client = HubClient::new(
        config.hub_base_url.clone(),
        config.hub_token.clone(),
        config.dataset_cache_dir.clone(),
    );
    let dataset_service = DatasetService::new(Arc::new(hub_client));

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(predictor.clone()))
            .app_data(web::Data::new(dataset_service.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
