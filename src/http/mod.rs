//! HTTP protocol layer module
//!
//! Body types and content-type detection shared by the JSON and file responders.

pub mod body;
pub mod mime;

pub use body::Body;
