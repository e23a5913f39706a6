pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod upstream;
pub mod web;

use actix_web::web::Data;

use config::Config;
use credential::CredentialStrategy;
use upstream::UpstreamClient;

// App state structure
pub struct AppState {
    pub credentials: CredentialStrategy,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: &Config) -> Data<Self> {
        Data::new(Self {
            credentials: config.credentials.clone(),
            upstream: UpstreamClient::new(&config.upstream_url),
        })
    }
}
