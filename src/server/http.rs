//! Request handling
//!
//! # Endpoints
//!
//! * `GET /health` - returns `ok`
//! * `POST /uploadFile`, `/uploadImage`, `/uploadSeveralFiles`, `/uploadSeveralImages`
//! * Anything else - 404 Not Found
//!
//! Upload route responses are always JSON written by [`ResponseReporter`]:
//! 200 once intake ran (even when parts failed), 400/413 when the multipart
//! body could not be read, 405 for a wrong method on an upload path.

use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::{BodyStream, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::AppState;
use crate::metrics;
use crate::router::{self, RouterError, UploadRoute};
use crate::upload::multipart::{read_file_parts, MultipartError};
use crate::upload::{ResponseReporter, UploadReport};

/// Route one request
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    info!("Handling {} {}", method, path);

    if path == "/health" && method == Method::GET {
        return Ok(plain_text(StatusCode::OK, "ok"));
    }

    let route = match router::resolve(&method, &path) {
        Ok(route) => route,
        Err(RouterError::NotFound(_)) => {
            return Ok(plain_text(StatusCode::NOT_FOUND, "Not Found"));
        }
        Err(e @ RouterError::MethodNotAllowed { .. }) => {
            warn!("{}", e);
            metrics::record_rejected_request("method_not_allowed");
            let report = UploadReport::request_rejected("method_not_allowed", e.to_string());
            let mut response = ResponseReporter::respond(StatusCode::METHOD_NOT_ALLOWED, &report);
            response
                .headers_mut()
                .insert(hyper::header::ALLOW, HeaderValue::from_static("POST"));
            return Ok(response);
        }
    };

    Ok(handle_upload(req, route, &state).await)
}

async fn handle_upload(
    req: Request<Incoming>,
    route: &UploadRoute,
    state: &AppState,
) -> Response<Full<Bytes>> {
    let start = Instant::now();

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let body = BodyStream::new(req.into_body())
        .try_filter_map(|frame| async move { Ok::<_, hyper::Error>(frame.into_data().ok()) });

    let parts = match read_file_parts(content_type.as_deref(), body, state.limits).await {
        Ok(parts) => parts,
        Err(e) => {
            warn!(route = route.path, error = %e, "Rejected malformed upload request");
            let status = match &e {
                MultipartError::SizeLimitExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            };
            metrics::record_rejected_request("malformed_request");
            let report = UploadReport::request_rejected("malformed_request", e.to_string());
            return ResponseReporter::respond(status, &report);
        }
    };

    info!(route = route.path, parts = parts.len(), "Multipart body read");

    let result = state.intake.run(route.mode, route.policy, parts).await;
    let report = UploadReport::from_result(&result);

    metrics::record_request(
        route.path,
        result.has_failure(),
        start.elapsed().as_secs_f64(),
    );
    info!(
        route = route.path,
        outcomes = result.outcomes().len(),
        error = report.error,
        duration_ms = start.elapsed().as_millis() as u64,
        "Upload request completed"
    );

    ResponseReporter::respond(StatusCode::OK, &report)
}

fn plain_text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
