//! # Slumber Connector
//!
//! Client side of Slumber: fetches remote models and instances over HTTP,
//! resolves remote object references into lazily loaded proxies, and
//! provides the remote-user authentication backend.

pub mod authentication;
mod connector;
mod http;
mod instance;
mod model;

pub use authentication::*;
pub use connector::*;
pub use http::*;
pub use instance::*;
pub use model::*;
