//! `controld`: a local control-socket daemon serving a JSON API.

pub mod config;
pub mod daemon;
pub mod error;
pub mod http;
pub mod logger;
