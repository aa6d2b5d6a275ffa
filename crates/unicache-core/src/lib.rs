//! unicache-core: Core traits and types for the unicache library
//!
//! This crate provides the pieces shared by every unicache crate: the error
//! taxonomy, type shapes and fingerprints, the self-describing value codec,
//! and the backend, key and metrics traits.

// Lets `#[derive(CacheValue)]` output resolve inside this crate's own tests.
extern crate self as unicache_core;

mod codec;
mod error;
mod fingerprint;
mod shape;
mod traits;
mod types;

pub use codec::{PayloadHeader, ValueCodec};
pub use error::{BoxError, CacheError, ErrorKind, Result};
pub use fingerprint::{CacheValue, Fingerprint, FingerprintRegistry, TypeFingerprint};
pub use shape::{Shape, ShapeWriter};
pub use traits::*;
pub use types::*;
