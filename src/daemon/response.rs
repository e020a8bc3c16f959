//! API response envelope
//!
//! Every JSON answer of the daemon is a [`Resp`]: a status code, a `type`
//! discriminator and an optional `result` payload, plus a few optional
//! daemon-wide fields. Absent optional fields are left out of the body
//! entirely; `type` and `status-code` are always written.

use chrono::{DateTime, Utc};
use hyper::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use hyper::http::request::Parts;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::body::{self, Body};
use crate::logger;

/// Discriminator serialized as the envelope's `type` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Envelope built without a kind; written as `""`
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "sync")]
    Sync,
    #[serde(rename = "async")]
    Async,
    #[serde(rename = "error")]
    Error,
}

impl ResponseType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Sync => "sync",
            Self::Async => "async",
            Self::Error => "error",
        }
    }
}

/// Machine-readable error class carried next to an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    InvalidInput,
    FileUnavailable,
    Maintenance,
}

/// `result` payload of error envelopes, also used for maintenance notices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ErrorResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            value: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Response envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resp {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    #[serde(rename = "status-code")]
    pub status: u16,
    /// Reason phrase of `status`
    #[serde(rename = "status", default, skip_serializing_if = "String::is_empty")]
    pub status_text: String,
    /// Operation id of async envelopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<ErrorResult>,
    #[serde(rename = "warning-count", default, skip_serializing_if = "Option::is_none")]
    pub warning_count: Option<u32>,
    #[serde(rename = "warning-timestamp", default, skip_serializing_if = "Option::is_none")]
    pub warning_timestamp: Option<DateTime<Utc>>,
}

impl Resp {
    fn new(kind: ResponseType, status: StatusCode, result: Option<Value>) -> Self {
        Self {
            kind,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            // A JSON null is the same as no result at all
            result: result.filter(|r| !r.is_null()),
            ..Self::default()
        }
    }

    /// 200 OK with `result`
    pub fn sync(result: Value) -> Self {
        Self::new(ResponseType::Sync, StatusCode::OK, Some(result))
    }

    /// 201 Created; `resource` is added to `result` and echoed as `Location`
    pub fn created(resource: &str, mut result: Map<String, Value>) -> Self {
        result.insert("resource".to_string(), Value::from(resource));
        Self::new(ResponseType::Sync, StatusCode::CREATED, Some(Value::Object(result)))
    }

    /// 202 Accepted for a started operation, pointing at `resource`
    pub fn async_change(change: impl Into<String>, resource: &str) -> Self {
        let mut resp = Self::new(
            ResponseType::Async,
            StatusCode::ACCEPTED,
            Some(serde_json::json!({ "resource": resource })),
        );
        resp.change = Some(change.into());
        resp
    }

    pub fn error(status: StatusCode, error: ErrorResult) -> Self {
        let result = serde_json::to_value(error).ok();
        Self::new(ResponseType::Error, status, result)
    }

    #[must_use]
    pub fn with_maintenance(mut self, notice: ErrorResult) -> Self {
        self.maintenance = Some(notice);
        self
    }

    #[must_use]
    pub fn with_warnings(mut self, count: u32, latest: DateTime<Utc>) -> Self {
        self.warning_count = Some(count);
        self.warning_timestamp = Some(latest);
        self
    }

    /// `Location` value: only 201 and 202 carry one, taken from `result.resource`
    pub fn location(&self) -> Option<&str> {
        match self.status {
            201 | 202 => self
                .result
                .as_ref()?
                .get("resource")?
                .as_str()
                .filter(|resource| !resource.is_empty()),
            _ => None,
        }
    }

    /// Render the envelope as an HTTP response.
    ///
    /// The body is the JSON encoding of `self`. A `status` that is not a valid
    /// HTTP status code is sent as 500 on the wire, while the body keeps the
    /// original `status-code`.
    pub fn render(&self, _req: &Parts) -> Response<Body> {
        let json = match serde_json::to_vec(self) {
            Ok(j) => j,
            Err(e) => {
                logger::log_error(&format!("Failed to serialize response: {e}"));
                return serialization_failure();
            }
        };

        let status = StatusCode::from_u16(self.status).unwrap_or_else(|_| {
            logger::log_warning(&format!(
                "Envelope status {} is not a valid HTTP status, sending 500",
                self.status
            ));
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let mut builder = Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json");

        if let Some(location) = self.location() {
            match HeaderValue::from_str(location) {
                Ok(value) => builder = builder.header(LOCATION, value),
                Err(e) => logger::log_warning(&format!(
                    "Dropping unrepresentable Location '{location}': {e}"
                )),
            }
        }

        builder.body(body::full(json)).unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build {status} response: {e}"));
            serialization_failure()
        })
    }
}

fn serialization_failure() -> Response<Body> {
    let mut response = Response::new(body::full(
        r#"{"type":"error","status-code":500,"status":"Internal Server Error","result":{"message":"internal error"}}"#,
    ));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
