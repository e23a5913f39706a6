use actix_web::{App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use wallet_chat::config::Config;
use wallet_chat::web::routes;
use wallet_chat::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting wallet chat proxy");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(&config);

    info!("Listening on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
