//! Control-socket daemon
//!
//! The response layer ([`response`], [`errors`], [`file`]) and the small
//! server and route table that host it.

pub mod api;
pub mod changes;
pub mod errors;
pub mod file;
pub mod reply;
pub mod response;
pub mod server;

pub use errors::{make_error_responder, ErrorResponder};
pub use file::{file_response, FileResponse};
pub use reply::Reply;
pub use response::{ErrorKind, ErrorResult, Resp, ResponseType};
