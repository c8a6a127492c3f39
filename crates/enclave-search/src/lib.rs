//! Tenant-isolated vector search for enclave.
//!
//! [`TenantIndexClient`] manages one search backend index per tenant and
//! moves documents and similarity queries in and out of it.
//! [`VectorSource`] implementations turn text into the vectors it works
//! with.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod resilience;
pub mod wire;

pub use config::Config;
pub use embed::{AzureOpenAiEmbedder, EmbedderConfig, VectorSource};
pub use error::{EmbedError, EmbedResult, IndexError, IndexResult};
pub use index::{IndexClientConfig, QueryOutcome, TenantIndexClient};
pub use resilience::RetryPolicy;
