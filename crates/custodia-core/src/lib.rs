//! # custodia-core
//!
//! Core types, traits, and abstractions for the custodia asset archive.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other custodia crates depend on: the inventory
//! and archive domain models, the repository seams, the execution-gate
//! report types, the checksum utility, and the configuration surface.

pub mod checksum;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use checksum::{is_valid_checksum, sha256_hex, CHECKSUM_HEX_LEN};
pub use config::ArchiveConfig;
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;
