//! IPR Defaults
//!
//! Package-supplied defaults for integration policy inputs and streams.
//!
//! # Core Operations
//!
//! - **Resolve**: [`resolve_defaults`] turns a [`PackageDescriptor`] into a
//!   [`DefaultsMap`](ipr_model::DefaultsMap) keyed by input id
//! - **Merge**: [`merge_input`] / [`merge_vars`] fill unset fields of a record
//!   with those defaults, producing a comparison-only view
//! - **Cache**: [`DefaultsCache`] memoizes resolution per package name and version
//!
//! # Architecture
//!
//! ```text
//! PackageSource → PackageDescriptor → resolve_defaults → DefaultsMap → merge_input
//!                        ↑_____________________↓
//!                          DefaultsCache (per package key)
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod descriptor;
pub mod error;
pub mod merge;
pub mod resolver;

pub use cache::{CacheStats, DefaultsCache, PackageKey, PackageSource};
pub use descriptor::{DataStream, DataStreamStream, PackageDescriptor, PolicyTemplate, TemplateInput, VarDecl};
pub use error::DefaultsError;
pub use merge::{merge_input, merge_stream, merge_streams, merge_vars};
pub use resolver::resolve_defaults;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
