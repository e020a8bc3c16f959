//! Error responders
//!
//! An [`ErrorResponder`] is fixed to one HTTP status and turns a message into
//! an error envelope. Literal messages are used as given; formatted messages go
//! through `format_args!`, so a `%` or `{}` inside a literal never triggers
//! substitution.

use std::fmt;

use hyper::StatusCode;

use super::response::{ErrorKind, ErrorResult, Resp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorResponder {
    status: StatusCode,
}

impl ErrorResponder {
    pub const fn new(status: StatusCode) -> Self {
        Self { status }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Error envelope whose message is `message`, verbatim
    pub fn message(&self, message: impl Into<String>) -> Resp {
        Resp::error(self.status, ErrorResult::new(message))
    }

    /// Error envelope whose message is the rendered `args`
    pub fn format(&self, args: fmt::Arguments<'_>) -> Resp {
        self.message(args.to_string())
    }

    /// Error envelope tagged with a machine-readable `kind`
    pub fn with_kind(&self, kind: ErrorKind, message: impl Into<String>) -> Resp {
        Resp::error(self.status, ErrorResult::new(message).with_kind(kind))
    }
}

/// Builds a responder for `status`
pub const fn make_error_responder(status: StatusCode) -> ErrorResponder {
    ErrorResponder::new(status)
}

pub const BAD_REQUEST: ErrorResponder = make_error_responder(StatusCode::BAD_REQUEST);
pub const UNAUTHORIZED: ErrorResponder = make_error_responder(StatusCode::UNAUTHORIZED);
pub const FORBIDDEN: ErrorResponder = make_error_responder(StatusCode::FORBIDDEN);
pub const NOT_FOUND: ErrorResponder = make_error_responder(StatusCode::NOT_FOUND);
pub const METHOD_NOT_ALLOWED: ErrorResponder =
    make_error_responder(StatusCode::METHOD_NOT_ALLOWED);
pub const INTERNAL_ERROR: ErrorResponder =
    make_error_responder(StatusCode::INTERNAL_SERVER_ERROR);
pub const UNAVAILABLE: ErrorResponder = make_error_responder(StatusCode::SERVICE_UNAVAILABLE);

/// Builds an error envelope from a responder and a message.
///
/// With a single message argument the text is taken literally. With a format
/// string followed by arguments, the arguments are substituted first.
///
/// ```
/// use controld::daemon::errors::NOT_FOUND;
/// use controld::error_response;
///
/// let literal = error_response!(NOT_FOUND, "disk usage above 90%");
/// let formatted = error_response!(NOT_FOUND, "no change with id {}", 7);
/// assert_eq!(literal.result.unwrap()["message"], "disk usage above 90%");
/// assert_eq!(formatted.result.unwrap()["message"], "no change with id 7");
/// ```
#[macro_export]
macro_rules! error_response {
    ($responder:expr, $message:expr $(,)?) => {
        $responder.message($message)
    };
    ($responder:expr, $fmt:literal, $($arg:tt)+) => {
        $responder.format(::std::format_args!($fmt, $($arg)+))
    };
}
