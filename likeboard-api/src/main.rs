use crate::{
    likes::LikeToggleService,
    mail::{LogMailer, MailError, MailQueue, MailRenderer},
    server::{AppUrl, ServerState},
};
use likeboard_db::{DbClient, DbError};
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod likes;
mod mail;
mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error loading mail templates: {0}")]
    Mail(#[from] MailError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "likeboard_api=debug,\
                likeboard_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Could not listen for ctrl-c, shutting down");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = config::get_env()?;

    let db_client = Arc::new(
        DbClient::connect(
            &env.database_url,
            env.database_max_connections,
            env.worker_id,
            env.process_id,
        )
        .await?,
    );
    db_client.migrate().await?;
    info!("Database ready");

    let renderer = MailRenderer::new(&env.app_name, &env.app_url)?;
    let (mail_queue, mail_receiver) = MailQueue::new();
    let tasks = TaskTracker::new();
    tasks.spawn(mail::run_worker(
        mail_receiver,
        renderer,
        LogMailer::new(env.mail_from.clone()),
    ));
    tasks.close();

    let state = ServerState {
        like_toggle: Arc::new(LikeToggleService::new(Arc::clone(&db_client), mail_queue)),
        db_client,
        app_url: AppUrl::new(&env.app_url),
    };
    let app = server::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    // The router owned the last queue handle, so the worker now drains and stops.
    tasks.wait().await;

    Ok(())
}
