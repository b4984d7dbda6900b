use domain::{InMemoryJobStore, Pipeline, Providers, Settings};
use log::{error, info};
use service::{config::Config, logging::Logger};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting conversation insights [{}], strict validation: {}",
        config.runtime_env(),
        config.strict_validation
    );

    let providers = match Providers::from_config(&config) {
        Ok(providers) => providers,
        Err(e) => {
            error!("Failed to build provider clients: {e}");
            std::process::exit(1);
        }
    };

    let pipeline = Pipeline::new(
        Arc::new(InMemoryJobStore::with_retention(config.max_retained_jobs)),
        providers,
        Settings::from_config(&config),
    );
    let app_state = web::AppState::new(service::AppState::new(config), Arc::new(pipeline));

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
