use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slm_core::{CoreConfig, DEFAULT_MAX_IN_FLIGHT, SampleService};
use slm_run::{AppState, app};

/// Main entry point for the SLM application.
///
/// Starts the REST server and blocks until it exits.
///
/// # Environment Variables
/// - `SLM_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `SLM_MAX_IN_FLIGHT`: cap on concurrently processed bulk items
///   (default: 8)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("slm=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("SLM_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let max_in_flight: usize = match std::env::var("SLM_MAX_IN_FLIGHT") {
        Ok(value) => value.parse()?,
        Err(_) => DEFAULT_MAX_IN_FLIGHT,
    };

    tracing::info!("++ Starting SLM REST on {}", rest_addr);

    let config = CoreConfig::new(max_in_flight)?;
    let sample_service = SampleService::new(config);

    let rest_app = app(AppState { sample_service });

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, rest_app).await?;

    Ok(())
}
