use tracing::info;
use tracing_subscriber::EnvFilter;

use twitter_atom::routes;
use twitter_atom::state::AppState;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Create and run the tokio runtime
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?
        .block_on(async { run_application().await })
}

async fn run_application() -> color_eyre::Result<()> {
    setup_tracing();

    let app_state = AppState::from_env()?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], app_state.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("twitter-atom listening on {}", addr);

    axum::serve(listener, routes::routes(app_state)).await?;

    Ok(())
}

/// Initialize the tracing subscriber, honoring `RUST_LOG` when set
fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("twitter_atom=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
