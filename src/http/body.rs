//! Response body type
//!
//! Every response the daemon writes uses one boxed body type, so buffered JSON
//! envelopes and streamed files can flow through the same service function.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use std::io;

pub type Body = BoxBody<Bytes, io::Error>;

/// Buffered body holding `data`
pub fn full(data: impl Into<Bytes>) -> Body {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}
