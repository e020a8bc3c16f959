//! API route table
//!
//! Maps request paths to handlers. Every handler answers with a [`Reply`]; the
//! reply is rendered here and access-logged.

use std::convert::Infallible;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use http_body_util::BodyExt;
use hyper::header::{CONTENT_LENGTH, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use serde::Deserialize;
use serde_json::json;

use super::errors::{BAD_REQUEST, FORBIDDEN, METHOD_NOT_ALLOWED, NOT_FOUND};
use super::file::file_response;
use super::reply::Reply;
use super::response::{ErrorKind, ErrorResult, Resp};
use crate::config::AppState;
use crate::error_response;
use crate::http::body::Body;
use crate::logger::{self, AccessLogEntry};

/// Service entry point for one request
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: &str,
) -> Result<Response<Body>, Infallible>
where
    B: hyper::body::Body + Send,
    B::Data: Send,
    B::Error: Display,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let notice = state.config.daemon.maintenance.as_ref().map(|message| {
        ErrorResult::new(message.as_str()).with_kind(ErrorKind::Maintenance)
    });
    let reply = route(&parts, body, &state).await.with_maintenance(notice);
    let kind = reply.kind();
    let response = reply.serve(&parts).await;

    if state.config.logging.access_log {
        log_access(&parts, &response, kind.as_str(), remote_addr, started, &state);
    }
    Ok(response)
}

async fn route<B>(parts: &Parts, body: B, state: &AppState) -> Reply
where
    B: hyper::body::Body,
    B::Error: Display,
{
    let path = parts.uri.path();
    let method = &parts.method;

    match path {
        "/v1/system-info" => match *method {
            Method::GET => system_info(state).into(),
            _ => method_not_allowed(method, path),
        },
        "/v1/health" => match *method {
            Method::GET => Resp::sync(json!({ "healthy": true })).into(),
            _ => method_not_allowed(method, path),
        },
        "/v1/changes" => match *method {
            Method::GET => Resp::sync(json!(state.changes.list().await)).into(),
            Method::POST => create_change(body, state).await.into(),
            _ => method_not_allowed(method, path),
        },
        _ => {
            if let Some(id) = path.strip_prefix("/v1/changes/") {
                match *method {
                    Method::GET => get_change(id, state).await.into(),
                    _ => method_not_allowed(method, path),
                }
            } else if let Some(name) = path.strip_prefix("/v1/files/") {
                match *method {
                    Method::GET => serve_file(name, &state.config.daemon.files_dir).await,
                    _ => method_not_allowed(method, path),
                }
            } else {
                NOT_FOUND
                    .with_kind(ErrorKind::NotFound, format!("invalid API endpoint requested: {path}"))
                    .into()
            }
        }
    }
}

fn method_not_allowed(method: &Method, path: &str) -> Reply {
    error_response!(METHOD_NOT_ALLOWED, "method {} not allowed on {}", method, path).into()
}

fn system_info(state: &AppState) -> Resp {
    Resp::sync(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "start-time": state.start_time,
    }))
}

#[derive(Debug, Deserialize)]
struct ChangeRequest {
    kind: String,
    #[serde(default)]
    summary: String,
}

async fn create_change<B>(body: B, state: &AppState) -> Resp
where
    B: hyper::body::Body,
    B::Error: Display,
{
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return error_response!(BAD_REQUEST, "cannot read request body: {}", e),
    };

    let request: ChangeRequest = match serde_json::from_slice(&bytes) {
        Ok(r) => r,
        Err(e) => {
            return BAD_REQUEST.with_kind(
                ErrorKind::InvalidInput,
                format!("cannot decode request body: {e}"),
            )
        }
    };

    if request.kind.trim().is_empty() {
        return BAD_REQUEST.with_kind(ErrorKind::InvalidInput, "change kind must not be empty");
    }

    let change = state.changes.create(&request.kind, &request.summary).await;
    logger::log_debug(&format!("Accepted change {} ({})", change.id, change.kind));
    Resp::async_change(change.id.clone(), &change.resource())
}

async fn get_change(id: &str, state: &AppState) -> Resp {
    match state.changes.get(id).await {
        Some(change) => Resp::sync(json!(change)),
        None => NOT_FOUND.with_kind(ErrorKind::NotFound, format!("cannot find change with id {id:?}")),
    }
}

async fn serve_file(name: &str, files_dir: &str) -> Reply {
    match resolve_file(name, Path::new(files_dir)).await {
        Ok(path) => file_response(path).into(),
        Err(resp) => resp.into(),
    }
}

/// Resolve `name` inside `root`, refusing anything that escapes it
async fn resolve_file(name: &str, root: &Path) -> Result<PathBuf, Resp> {
    let not_found = || NOT_FOUND.with_kind(ErrorKind::NotFound, format!("file {name:?} not found"));

    if name.is_empty() {
        return Err(not_found());
    }

    let root = tokio::fs::canonicalize(root).await.map_err(|e| {
        logger::log_warning(&format!(
            "Files directory '{}' not accessible: {e}",
            root.display()
        ));
        not_found()
    })?;

    // File not found is common (404), no need to log it
    let candidate = tokio::fs::canonicalize(root.join(name))
        .await
        .map_err(|_| not_found())?;

    if !candidate.starts_with(&root) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {name} -> {}",
            candidate.display()
        ));
        return Err(FORBIDDEN.with_kind(
            ErrorKind::PermissionDenied,
            format!("access to {name:?} is not allowed"),
        ));
    }
    Ok(candidate)
}

fn log_access(
    parts: &Parts,
    response: &Response<Body>,
    kind: &str,
    remote_addr: &str,
    started: Instant,
    state: &AppState,
) {
    let mut entry = AccessLogEntry::new(
        remote_addr.to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = format!("{:?}", parts.version).trim_start_matches("HTTP/").to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| hyper::body::Body::size_hint(response.body()).exact());
    entry.user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    entry.kind = kind.to_string();
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_file_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("icon.png"), b"png").unwrap();

        let path = resolve_file("icon.png", dir.path()).await.unwrap();
        assert!(path.ends_with("icon.png"));
    }

    #[tokio::test]
    async fn test_resolve_file_rejects_traversal() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("files");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(outer.path().join("secret.txt"), b"nope").unwrap();

        let err = resolve_file("../secret.txt", &root).await.unwrap_err();
        assert_eq!(err.status, 403);
    }

    #[tokio::test]
    async fn test_resolve_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_file("absent.bin", dir.path()).await.unwrap_err();
        assert_eq!(err.status, 404);
        let err = resolve_file("", dir.path()).await.unwrap_err();
        assert_eq!(err.status, 404);
    }
}
