//! # Slumber Server Library
//!
//! Builds and runs a Slumber server: registers the exposed models, wires
//! the remote-user authentication backend and serves the REST router.

pub mod app;
pub mod demo;
pub mod startup;

pub use app::*;
