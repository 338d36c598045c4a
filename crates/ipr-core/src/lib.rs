//! IPR Core - Integration Policy Reconciler
//!
//! Ties the subsystems together around one record:
//! - Builds the request for a planned record
//! - Resolves secret handles in the server's response (write and read path)
//! - Resolves package defaults once per package version
//! - Keeps the known representation wherever it is semantically unchanged
//! - Reports drift on read
//! - Upgrades records stored in an older shape
//!
//! # Example
//!
//! ```rust,ignore
//! use ipr_core::{Reconciler, ReconcileConfig};
//! use ipr_secrets::InMemoryPrivateStore;
//!
//! let reconciler = Reconciler::new(ReconcileConfig::new())?;
//! let mut store = InMemoryPrivateStore::new();
//!
//! let request = reconciler.request_for(&planned)?;
//! let response = client.update(&request)?;
//! let stored = reconciler.after_write(&planned, &request, response, &mut store, &packages)?;
//!
//! let outcome = reconciler.after_read(&stored, client.get(&id)?, &mut store, &packages)?;
//! if outcome.has_drift() {
//!     println!("changed: {:?}", outcome.drift);
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod convert;
pub mod error;
pub mod reconciler;

pub use config::ReconcileConfig;
pub use convert::WireConvert;
pub use error::{ReconcileError, ReconcileResult};
pub use reconciler::{records_equal, ReadOutcome, Reconciler, TRACKED_ATTRIBUTES};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with IPR Core
    pub use crate::{ReadOutcome, ReconcileConfig, ReconcileError, Reconciler, WireConvert};
    pub use ipr_defaults::{DefaultsCache, PackageKey, PackageSource};
    pub use ipr_model::{IntegrationPolicy, PolicyRequest, PolicyResponse};
    pub use ipr_secrets::{InMemoryPrivateStore, PrivateStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
