// src/server/mod.rs

use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use std::{convert::Infallible, sync::Arc};
use tracing::{error, info, warn};
use warp::{
    http::StatusCode,
    reject::{MethodNotAllowed, Rejection},
    reply::{self, Reply},
    Filter,
};

use crate::{
    clean::CleanedRow, config::ServerConfig, error::PipelineError, fetch::build_client,
    pipeline::fetch_and_clean,
};

pub const SERVICE_TITLE: &str = "NSE Data API";

/// What every request handler gets: the shared client and the startup config.
#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(client: Client, config: ServerConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    endpoints: [&'static str; 1],
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

fn error_reply(status: StatusCode, detail: impl Into<String>) -> reply::WithStatus<reply::Json> {
    reply::with_status(
        reply::json(&ErrorResponse {
            detail: detail.into(),
        }),
        status,
    )
}

async fn read_root() -> Result<impl Reply, Rejection> {
    Ok(reply::json(&RootResponse {
        message: "NSE Data API is running",
        endpoints: ["/nse"],
    }))
}

async fn get_nse_data(state: AppState) -> Result<impl Reply, Rejection> {
    Ok(nse_reply(
        fetch_and_clean(&state.client, &state.config).await,
    ))
}

/// Rows as a JSON array, or the error's status with a `detail` body.
fn nse_reply(result: Result<Vec<CleanedRow>, PipelineError>) -> reply::WithStatus<reply::Json> {
    match result {
        Ok(rows) => reply::with_status(reply::json(&rows), StatusCode::OK),
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                error!(%status, error = %e, "NSE request failed");
            } else {
                warn!(%status, error = %e, "NSE request failed");
            }
            error_reply(status, e.detail())
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "Not Found"));
    }
    if err.find::<MethodNotAllowed>().is_some() {
        return Ok(error_reply(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
        ));
    }
    error!(rejection = ?err, "unhandled rejection");
    Ok(error_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
    ))
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// `GET /` and `GET /api/nse`, with framework-style JSON errors for everything else.
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let root = warp::path::end().and(warp::get()).and_then(read_root);

    let nse = warp::path!("api" / "nse")
        .and(warp::get())
        .and(with_state(state))
        .and_then(get_nse_data);

    root.or(nse).recover(handle_rejection)
}

/// Bind and run until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let client = build_client()?;
    let addr = config.bind_addr();
    info!(
        source = %config.source_url,
        timeout = ?config.fetch_timeout,
        table = config.table_index,
        "{} configured",
        SERVICE_TITLE
    );

    let state = AppState::new(client, config);
    let (bound, server) = warp::serve(routes(state)).try_bind_with_graceful_shutdown(
        addr,
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "listening for shutdown signal failed");
            }
        },
    )?;

    info!("Server listening on http://{}", bound);
    info!("Data endpoint: GET http://{}/api/nse", bound);
    server.await;
    info!("Server stopped");

    Ok(())
}
