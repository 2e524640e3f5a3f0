//! # Slumber REST
//!
//! Server side of Slumber: serves exposed models below the applications
//! root as JSON documents, with remote-user authentication and request
//! logging.

pub mod accept;
pub mod controllers;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
