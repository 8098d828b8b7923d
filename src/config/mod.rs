//! Configuration module for snapshot runs
//!
//! This module provides the `SnapshotConfig` struct and its type-safe builder
//! with validation and defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::{Complete, SnapshotConfigBuilder, WithDocumentUrl};
pub use types::{RenderConfig, SnapshotConfig};
