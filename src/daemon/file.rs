//! File responder
//!
//! Streams a file from disk as a download. The file is opened when the
//! response is served, not when the responder is built, and the handle lives
//! inside the body stream: it is closed when the stream finishes, fails, or is
//! dropped because the client went away.

use std::path::PathBuf;

use futures_util::TryStreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::http::request::Parts;
use hyper::{Response, StatusCode};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use super::errors::INTERNAL_ERROR;
use super::response::ErrorKind;
use crate::http::body::Body;
use crate::http::mime;
use crate::logger;

/// Responder that serves the file at `path` as an attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResponse {
    path: PathBuf,
}

pub fn file_response(path: impl Into<PathBuf>) -> FileResponse {
    FileResponse { path: path.into() }
}

impl FileResponse {
    /// Final path segment, used as the download file name
    pub fn file_name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }

    /// `Content-Disposition` value for this file
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.file_name())
    }

    pub async fn serve(&self, req: &Parts) -> Response<Body> {
        let (file, length) = match self.open().await {
            Ok(opened) => opened,
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to open '{}' for download: {e}",
                    self.path.display()
                ));
                return INTERNAL_ERROR
                    .with_kind(
                        ErrorKind::FileUnavailable,
                        format!("cannot read file {}: {e}", self.file_name()),
                    )
                    .render(req);
            }
        };

        let stream = ReaderStream::new(file).map_ok(Frame::data);
        let body = StreamBody::new(stream).boxed();

        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, mime::content_type_for(&self.path))
            .header(CONTENT_LENGTH, length)
            .header(CONTENT_DISPOSITION, self.content_disposition())
            .body(body)
            .unwrap_or_else(|e| {
                logger::log_error(&format!("Failed to build file response: {e}"));
                INTERNAL_ERROR
                    .message("cannot build file response")
                    .render(req)
            })
    }

    async fn open(&self) -> std::io::Result<(File, u64)> {
        let file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(std::io::Error::other("is a directory"));
        }
        Ok((file, metadata.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Request;

    fn parts() -> Parts {
        Request::get("/v1/files/icon.png").body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_file_response_sets_content_disposition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.png");
        std::fs::write(&path, b"").unwrap();

        let response = file_response(&path).serve(&parts()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=icon.png"
        );
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/png");
    }

    #[tokio::test]
    async fn test_file_body_streams_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let content = "line\n".repeat(20_000);
        std::fs::write(&path, &content).unwrap();

        let response = file_response(&path).serve(&parts()).await;
        assert_eq!(
            response.headers().get(CONTENT_LENGTH).unwrap(),
            &content.len().to_string()
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes, content.as_bytes());
    }

    #[tokio::test]
    async fn test_missing_file_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let response = file_response(dir.path().join("gone.bin"))
            .serve(&parts())
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(CONTENT_DISPOSITION).is_none());

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["type"], "error");
        assert_eq!(body["result"]["kind"], "file-unavailable");
        assert!(body["result"]["message"]
            .as_str()
            .unwrap()
            .starts_with("cannot read file gone.bin"));
    }

    #[tokio::test]
    async fn test_directory_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let response = file_response(dir.path()).serve(&parts()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_file_name_strips_directories() {
        assert_eq!(file_response("/srv/files/icon.png").file_name(), "icon.png");
        assert_eq!(file_response("relative/dir/data.tar").file_name(), "data.tar");
        assert_eq!(file_response("plain").file_name(), "plain");
    }
}
