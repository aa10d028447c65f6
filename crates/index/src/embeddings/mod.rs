//! Embedding capability.
//!
//! The builder and the query engine must embed with the same provider; the
//! provider [`fingerprint`](EmbeddingProvider::fingerprint) is recorded on
//! every index version and checked at query time.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
