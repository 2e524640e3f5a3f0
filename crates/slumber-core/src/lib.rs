//! # Slumber Core
//!
//! Core types shared by the Slumber server and connector: the error
//! taxonomy, the native model abstraction, field descriptors, the type
//! mapping registry, and the JSON field codec.

pub mod codec;
pub mod error;
pub mod field;
pub mod model;
pub mod registry;
pub mod result;
pub mod telemetry;

pub use codec::*;
pub use error::*;
pub use field::{FieldKind, FieldMeta, FieldType};
pub use model::*;
pub use registry::*;
pub use result::*;
pub use telemetry::*;
