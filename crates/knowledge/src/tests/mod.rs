//! Cross-component tests for the knowledge crate.
