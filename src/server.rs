// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! HTTP surface: a single `GET /?ref=<key>` route that answers with a
//! streamed zip attachment.
//!
//! Everything that can fail cleanly (missing parameter, unknown reference,
//! probe failure) fails before the first response byte. Once headers are out
//! the producer task only ever finishes the archive or stops early because
//! the client disconnected; either way the request is logged with its
//! outcome.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::probe::{self, ProbeError};
use crate::resolve::{self, ResolveError};
use crate::store::{KeyValueStore, ObjectStore};
use crate::streamer::stream_archive;
use crate::zip::ZipStreamWriter;

/// Buffer between the zip producer task and the response body. Writes beyond
/// this stall until the client catches up, which is what throttles the
/// upstream object reads.
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Per-process shared clients, constructed once at startup and immutable
/// afterwards. Cloned `Arc`s are handed to every request task.
pub struct ServiceContext {
    pub kv: Arc<dyn KeyValueStore>,
    pub objects: Arc<dyn ObjectStore>,
}

#[derive(Debug, thiserror::Error)]
enum RequestError {
    #[error("Missing required parameters. Pass ?ref= to use.")]
    MissingRef,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Failed to process files for download")]
    Probe(#[source] ProbeError),
}

impl RequestError {
    fn status(&self) -> StatusCode {
        match self {
            RequestError::MissingRef => StatusCode::BAD_REQUEST,
            RequestError::Resolve(_) => StatusCode::FORBIDDEN,
            RequestError::Probe(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

pub fn router(ctx: Arc<ServiceContext>) -> Router {
    Router::new().route("/", get(download)).with_state(ctx)
}

/// Binds the listener and serves until the process is stopped.
pub async fn serve(ctx: Arc<ServiceContext>, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    info!("listening on port {port}");
    Ok(axum::serve(listener, router(ctx).into_make_service()).await?)
}

async fn download(
    State(ctx): State<Arc<ServiceContext>>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    match try_download(ctx, &method, &uri, started, &params).await {
        Ok(response) => response,
        Err(err) => {
            warn!(%method, %uri, "request failed: {err}");
            err.into_response()
        }
    }
}

async fn try_download(
    ctx: Arc<ServiceContext>,
    method: &Method,
    uri: &Uri,
    started: Instant,
    params: &HashMap<String, String>,
) -> Result<Response, RequestError> {
    let reference = params
        .get("ref")
        .filter(|value| !value.is_empty())
        .ok_or(RequestError::MissingRef)?;

    // Resolve and probe fully before committing headers; these are the only
    // client-visible failure points.
    let manifest = resolve::resolve(ctx.kv.as_ref(), reference).await?;
    let total_size = probe::total_size(ctx.objects.as_ref(), &manifest.files)
        .await
        .map_err(RequestError::Probe)?;
    let download_name = format!("{}-videos.zip", manifest.name);

    let (writer, reader) = tokio::io::duplex(STREAM_BUFFER_SIZE);
    let objects = ctx.objects.clone();
    let files = manifest.files;
    let method = method.clone();
    let uri = uri.clone();
    tokio::spawn(async move {
        match stream_archive(objects.as_ref(), &files, ZipStreamWriter::new(writer)).await {
            Ok(stats) => info!(
                %method, %uri,
                elapsed = ?started.elapsed(),
                written = stats.written,
                skipped = stats.skipped,
                "download complete"
            ),
            Err(err) => warn!(%method, %uri, "stream aborted: {err}"),
        }
    });

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download_name}\""),
            ),
            (header::CONTENT_LENGTH, total_size.to_string()),
        ],
        Body::from_stream(ReaderStream::new(reader)),
    )
        .into_response())
}
