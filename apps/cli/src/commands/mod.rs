//! Command implementations for the Strand CLI.

pub mod build;
pub mod cache;
pub mod corpora;
