use tokio::net::TcpListener;
use tracing::info;
use rfp_analyzer::{
    config::Config,
    api::routes::create_router,
    logging::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;
    init_logger(config.debug_mode);

    let server_addr = config.server_addr;
    if config.gemini_api_key.is_none() {
        info!("GEMINI_API_KEY is not set; requests must supply api_key");
    }
    info!("Data directory: {}", config.data_dir.display());

    // Create application state
    let app_state = AppState::new(config)?;

    // Build the router with routes
    let app = create_router(app_state);

    // Create the listener
    let listener = TcpListener::bind(server_addr).await?;

    // Start the server
    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
