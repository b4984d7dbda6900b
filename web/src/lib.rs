use std::sync::Arc;

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use domain::Pipeline;
use log::*;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

mod controller;
mod error;
pub mod router;

pub(crate) use error::Result;

// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub service: service::AppState,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(service: service::AppState, pipeline: Arc<Pipeline>) -> Self {
        Self { service, pipeline }
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let config = app_state.service.config().clone();
    let interface = config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let host = format!("{}:{}", interface, config.port);

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    debug!("CORS allowed origins: {:?}", origins);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(origins);

    let listener = TcpListener::bind(&host).await?;
    info!(
        "Server starting... listening for connections on http://{} ({})",
        host,
        config.runtime_env()
    );

    axum::serve(listener, router::define_routes(app_state).layer(cors)).await
}
