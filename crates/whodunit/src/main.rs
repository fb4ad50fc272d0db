use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whodunit::{ServerConfig, WhodunitError, WhodunitServer};

#[tokio::main]
async fn main() -> Result<(), WhodunitError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whodunit=info,whodunit_room=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(bind = %config.bind, "configuration loaded");

    let mut server = WhodunitServer::builder().config(&config)?.build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
    }
    server.shutdown().await;
    Ok(())
}
