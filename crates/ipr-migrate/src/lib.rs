//! IPR Migrate
//!
//! Upgrades stored integration policy records through three generations of
//! shape. Upgrades only go forward and never touch the source record.
//!
//! # Generations
//!
//! - **0**: vars and streams as raw strings, inputs as a list
//! - **1**: the same list shape with normalized JSON fields; `""` means unset
//! - **2** (current): inputs keyed by id, streams decoded into a map
//!
//! # Example
//!
//! ```rust,ignore
//! use ipr_migrate::MigrationRegistry;
//!
//! let registry = MigrationRegistry::standard();
//! let policy = registry.upgrade_to_current(&stored, recorded_version)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod registry;
pub mod v0;
pub mod v1;
pub mod v2;

pub use error::MigrationError;
pub use registry::{MigrationRegistry, MigrationStep, MigrationTransformFn, CURRENT_VERSION};
pub use v0::{InputV0, PolicyV0};
pub use v1::{v0_to_v1, InputV1, PolicyV1};
pub use v2::{v0_to_v2, v1_to_v2};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
