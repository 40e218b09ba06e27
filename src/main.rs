use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scormkit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    scormkit::run().await?;
    Ok(())
}
