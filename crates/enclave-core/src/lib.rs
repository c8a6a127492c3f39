//! Core domain model for enclave.
//!
//! This crate defines the tenant identifier, the document record that is
//! ingested into a tenant's index, and the records a similarity query
//! produces. It has no knowledge of HTTP or of the embedding provider.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::{Document, SearchHit, SearchResult, TenantId};
