//! Cross-module tests for the index lifecycle.

pub(crate) mod support;

mod scenario;
