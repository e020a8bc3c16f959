//! What a route handler hands back to the HTTP layer

use hyper::http::request::Parts;
use hyper::Response;

use super::file::FileResponse;
use super::response::{ErrorResult, Resp, ResponseType};
use crate::http::body::Body;

pub enum Reply {
    Json(Resp),
    File(FileResponse),
}

impl Reply {
    pub async fn serve(self, req: &Parts) -> Response<Body> {
        match self {
            Self::Json(resp) => resp.render(req),
            Self::File(file) => file.serve(req).await,
        }
    }

    /// Envelope `type` token, empty for file downloads
    pub const fn kind(&self) -> ResponseType {
        match self {
            Self::Json(resp) => resp.kind,
            Self::File(_) => ResponseType::Unset,
        }
    }

    /// Attach a maintenance notice to JSON replies; file downloads are left untouched
    #[must_use]
    pub fn with_maintenance(self, notice: Option<ErrorResult>) -> Self {
        match (self, notice) {
            (Self::Json(resp), Some(notice)) => Self::Json(resp.with_maintenance(notice)),
            (reply, _) => reply,
        }
    }
}

impl From<Resp> for Reply {
    fn from(resp: Resp) -> Self {
        Self::Json(resp)
    }
}

impl From<FileResponse> for Reply {
    fn from(file: FileResponse) -> Self {
        Self::File(file)
    }
}
