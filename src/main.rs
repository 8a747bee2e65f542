use axum::serve;
use hcp_rp_frontend::build_app;
use hcp_rp_frontend::config::AppConfig;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .init();

    println!("HCP resource provider frontend");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{} location={} backend={:?}",
        config.server.host, config.server.port, config.server.location, config.database.backend
    );

    let app = build_app(&config).await?;

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("Frontend listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
