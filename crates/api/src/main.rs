use anyhow::Context;

use tally_api::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env().context("invalid configuration")?;
    tally_observability::init_with(config.log_format);

    let app = tally_api::app::build_app(&config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        strategy = ?config.transfer_strategy,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
