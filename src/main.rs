use std::io;

use actix_web::{middleware, web, App, HttpServer};

use roombook::{config::Config, store};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // build the store outside of `HttpServer::new` so that it is shared across all workers
    let registry = store::build_registry(&config).map_err(|e| {
        log::error!("Failed to initialize the store: {}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;

    if let Some(seed) = &config.bootstrap_admin {
        if let Err(e) = store::seed_admin(&registry, seed) {
            log::error!("Failed to seed admin {}: {}", seed.admin_id, e);
        }
    }

    let registry = web::Data::new(registry);
    let bind = (config.host.clone(), config.port);
    let config = web::Data::new(config);

    log::info!("starting HTTP server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(registry.clone())
            .app_data(config.clone())
            .app_data(roombook::json_config())
            .app_data(roombook::query_config())
            .app_data(roombook::path_config())
            .wrap(middleware::Logger::default())
            .configure(roombook::configure)
            .default_service(web::to(roombook::not_found))
    })
    .bind(bind)?
    .run()
    .await
}
