use uploads_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (telemetry, storage gateway, routes)
    let (_state, router) = uploads_api::setup::initialize_app(config.clone()).await?;

    uploads_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
