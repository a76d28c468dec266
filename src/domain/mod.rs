//! Domain Layer
//!
//! The deploy model without I/O.
//!
//! - `entities/` - ProjectSnapshot, BuildManifest, PackageManifest
//! - `value_objects/` - exclusion rules, pipeline states, remote target and layout
//! - `services/` - delta computation, large file guard
//! - `ports/` - interfaces implemented by infrastructure

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
