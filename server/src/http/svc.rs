use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{StatusCode, Uri},
    routing::get,
    Router,
};
use regex::Regex;
use tokio::net::TcpListener;
use tower::Service;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use api::request::Endpoint;
use common::config::HtsConfig;
use common::registry::DataSourceRegistry;

use crate::http::{bytes, data, info, ticket};

// read-only per-process state shared by every request handler.  built once
// at startup; no locks are needed afterwards
#[derive(Clone, Debug)]
pub struct HttpEndpoint {
    pub config: Arc<HtsConfig>,
    reads: DataSourceRegistry,
    variants: DataSourceRegistry,
    pub client: reqwest::Client,

    // the regex should only be created once, and this is the only place
    pub range_regex: Regex,
}

impl HttpEndpoint {
    pub fn new(config: Arc<HtsConfig>) -> Result<Self> {
        Ok(HttpEndpoint {
            reads: DataSourceRegistry::new(&config.reads.sources)
                .context("invalid reads data sources")?,
            variants: DataSourceRegistry::new(&config.variants.sources)
                .context("invalid variants data sources")?,
            client: reqwest::Client::new(),
            range_regex: Regex::new(r"(\d*)-(\d*)").context("invalid range regex")?,
            config,
        })
    }

    pub fn registry(&self, endpoint: Endpoint) -> &DataSourceRegistry {
        match endpoint {
            Endpoint::Reads => &self.reads,
            Endpoint::Variants => &self.variants,
        }
    }
}

pub async fn serve_http(config: Arc<HtsConfig>) -> Result<()> {
    let state = Arc::new(HttpEndpoint::new(config.clone())?);

    let router: Router<()> = Router::new()
        .route("/reads/service-info", get(info::reads_service_info))
        .route("/reads/data/{id}", get(data::reads_data))
        .route(
            "/reads/{id}",
            get(ticket::reads_ticket).post(ticket::reads_ticket_post),
        )
        .route("/variants/service-info", get(info::variants_service_info))
        .route("/variants/data/{id}", get(data::variants_data))
        .route(
            "/variants/{id}",
            get(ticket::variants_ticket).post(ticket::variants_ticket_post),
        )
        .route("/file-bytes", get(bytes::file_bytes))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let socket = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    let listener = TcpListener::bind(socket)
        .await
        .with_context(|| format!("failed to bind {socket}"))?;

    info!("listening on {socket}");

    let service = hyper::service::service_fn(
        move |request: axum::http::Request<hyper::body::Incoming>| router.clone().call(request),
    );

    // the main http server loop
    while let Ok((stream, _)) = listener.accept().await {
        let service = service.clone();

        let io = hyper_util::rt::TokioIo::new(stream);

        tokio::task::spawn(async move {
            if let Err(err) =
                hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new())
                    .serve_connection(io, service)
                    .await
            {
                // client disconnects land here as well, so this is not an
                // error-level event
                debug!("connection closed: {err}");
            }
        });
    }

    Ok(())
}

async fn fallback(_uri: Uri) -> StatusCode {
    StatusCode::NOT_FOUND
}
