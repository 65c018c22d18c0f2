//! Leadline - SMS lead follow-up assistant
//!
//! Loads leads from a CSV file, auto-replies to inbound SMS webhooks with
//! AI-generated follow-ups, and keeps a per-contact conversation log.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod leads;
mod notify;
mod routes;
mod sender;
mod signature;
mod storage;
mod wave;
mod writer;

use config::Config;
use sender::{SmsSender, TextbeltSender};
use storage::ChatStore;
use writer::{FollowupWriter, ReplyWriter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<ChatStore>,
    pub sender: Arc<dyn SmsSender>,
    pub writer: Arc<dyn ReplyWriter>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let store = Arc::new(ChatStore::new(&config.chat_dir));
    let sender: Arc<dyn SmsSender> = Arc::new(TextbeltSender::new(&config));
    let writer: Arc<dyn ReplyWriter> = Arc::new(FollowupWriter::new(&config, store.clone()));

    let state = AppState {
        config,
        store,
        sender,
        writer,
    };

    if state.config.wave_on_start {
        tracing::info!("starting follow-up wave");
        tokio::spawn(wave::send_wave(state.clone()));
    }

    let mode = state.config.mode();
    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!(mode, "Leadline running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
